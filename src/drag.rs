use crate::anchor::{clamp_to_screen, AnchorPoint, Offsets};
use crate::config::record::ConfigRecord;
use eframe::egui::{Pos2, Rect, Vec2};

/// Height of the draggable body of the HUD at scale 1. The strip below it
/// holds the playback controls and never starts a drag.
pub const DRAG_HANDLE_HEIGHT: f32 = 50.0;

/// Default tolerance for deciding whether a drop moved the HUD at all.
pub const OFFSET_EPSILON: f32 = 0.01;

/// Pointer and widget positions captured when the drag started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub start_pointer: Pos2,
    pub start_widget: Pos2,
}

/// Result of dropping the HUD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragRelease {
    pub anchor: AnchorPoint,
    pub offsets: Offsets,
    /// Anchor or offsets moved enough to be worth persisting.
    pub changed: bool,
}

/// Turns a press-drag-release gesture over the HUD into free movement and,
/// on release, an anchor plus exact offsets.
#[derive(Debug)]
pub struct DragAnchorResolver {
    session: Option<DragSession>,
    locked: bool,
    epsilon: f32,
}

impl Default for DragAnchorResolver {
    fn default() -> Self {
        Self::new(OFFSET_EPSILON)
    }
}

impl DragAnchorResolver {
    /// Starts locked; the HUD only moves in edit mode.
    pub fn new(epsilon: f32) -> Self {
        Self {
            session: None,
            locked: true,
            epsilon,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
        if locked {
            self.session = None;
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Primary button went down at `pointer`. `hovered` is the widget's own
    /// hit test. Starts a session when the HUD is unlocked and the pointer is
    /// over the body rather than the controls strip.
    pub fn press(&mut self, pointer: Pos2, widget: Rect, hovered: bool, scale: f32) -> bool {
        if self.locked || self.session.is_some() || !hovered {
            return false;
        }
        if pointer.y - widget.min.y >= DRAG_HANDLE_HEIGHT * scale {
            return false;
        }
        self.session = Some(DragSession {
            start_pointer: pointer,
            start_widget: widget.min,
        });
        tracing::debug!(?pointer, "HUD drag started");
        true
    }

    /// Live top-left for the current pointer, kept fully on screen. `None`
    /// when no drag is active.
    pub fn drag_position(&self, pointer: Pos2, widget_size: Vec2, screen: Vec2) -> Option<Pos2> {
        let session = self.session?;
        let delta = pointer - session.start_pointer;
        Some(clamp_to_screen(
            session.start_widget + delta,
            widget_size,
            screen,
        ))
    }

    /// End the session and classify where the widget was dropped. The record
    /// always receives the new anchor and offsets; `changed` tells the caller
    /// whether they are worth persisting.
    pub fn release(
        &mut self,
        widget: Rect,
        screen: Vec2,
        record: &mut ConfigRecord,
    ) -> Option<DragRelease> {
        self.session.take()?;
        if screen.x <= 0.0 || screen.y <= 0.0 {
            tracing::warn!(?screen, "dropping HUD drag on an empty screen");
            return None;
        }
        let centre = widget.center();
        let offsets = Offsets::new(centre.x / screen.x, centre.y / screen.y);
        let anchor = AnchorPoint::classify(offsets.x, offsets.y);

        let previous_anchor = record.anchor();
        let previous_offsets = record.offsets();
        let changed =
            previous_anchor != anchor || offsets.differs_from(previous_offsets, self.epsilon);
        record.place(anchor, offsets);
        tracing::debug!(?anchor, ?offsets, changed, "HUD drag released");
        Some(DragRelease {
            anchor,
            offsets,
            changed,
        })
    }

    /// Abandon the session without touching the record. Returns whether one
    /// was active.
    pub fn cancel(&mut self) -> bool {
        self.session.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2};

    fn widget_at(x: f32, y: f32) -> Rect {
        Rect::from_min_size(pos2(x, y), vec2(150.0, 50.0))
    }

    #[test]
    fn locked_resolver_ignores_press() {
        let mut drag = DragAnchorResolver::default();
        assert!(!drag.press(pos2(10.0, 10.0), widget_at(0.0, 0.0), true, 1.0));
        drag.set_locked(false);
        assert!(drag.press(pos2(10.0, 10.0), widget_at(0.0, 0.0), true, 1.0));
    }

    #[test]
    fn press_outside_or_on_controls_does_nothing() {
        let mut drag = DragAnchorResolver::default();
        drag.set_locked(false);
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(150.0, 63.0));
        assert!(!drag.press(pos2(300.0, 10.0), rect, false, 1.0));
        assert!(!drag.press(pos2(20.0, 55.0), rect, true, 1.0));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn locking_mid_drag_drops_session() {
        let mut drag = DragAnchorResolver::default();
        drag.set_locked(false);
        drag.press(pos2(10.0, 10.0), widget_at(0.0, 0.0), true, 1.0);
        drag.set_locked(true);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn cancel_leaves_record_alone() {
        let mut drag = DragAnchorResolver::default();
        drag.set_locked(false);
        drag.press(pos2(10.0, 10.0), widget_at(0.0, 0.0), true, 1.0);
        assert!(drag.cancel());
        assert!(!drag.cancel());
        let mut record = ConfigRecord::default();
        assert!(drag
            .release(widget_at(400.0, 300.0), vec2(800.0, 600.0), &mut record)
            .is_none());
        assert_eq!(record, ConfigRecord::default());
    }

    #[test]
    fn release_without_session_is_none() {
        let mut drag = DragAnchorResolver::default();
        let mut record = ConfigRecord::default();
        assert!(drag
            .release(widget_at(0.0, 0.0), vec2(800.0, 600.0), &mut record)
            .is_none());
    }
}
