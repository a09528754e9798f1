use crate::anchor::{clamp_to_screen, AnchorPoint, Offsets};
use crate::settings::HudSettings;
use eframe::egui::{self, Pos2, Rect, Vec2};

/// Width of the HUD at scale 1 with artwork shown.
pub const HUD_WIDTH: f32 = 150.0;
/// Width of the HUD at scale 1 with artwork hidden.
pub const HUD_COMPACT_WIDTH: f32 = 105.0;
pub const HUD_HEIGHT: f32 = 50.0;
/// Extra height of the playback controls strip at scale 1.
pub const CONTROLS_HEIGHT: f32 = 13.0;

/// Size of the HUD body for the given scale, without the controls strip.
pub fn hud_size(scale: f32, compact: bool) -> Vec2 {
    let width = if compact { HUD_COMPACT_WIDTH } else { HUD_WIDTH };
    egui::vec2(width * scale, HUD_HEIGHT * scale)
}

/// What the engine needs from the on-screen widget.
pub trait HudWidget {
    /// Full size, including the controls strip while it is shown.
    fn size(&self) -> Vec2;
    fn position(&self) -> Pos2;
    fn set_position(&mut self, pos: Pos2);
    /// Rebuild the widget for a new scale.
    fn retheme(&mut self, scale: f32);

    /// Show or hide the playback controls strip below the body.
    fn set_controls_visible(&mut self, _visible: bool) {}

    /// Height of the controls strip currently shown.
    fn controls_height(&self) -> f32 {
        0.0
    }

    fn rect(&self) -> Rect {
        Rect::from_min_size(self.position(), self.size())
    }

    /// The part of the widget that is dragged and anchored.
    fn body_rect(&self) -> Rect {
        let size = self.size();
        Rect::from_min_size(
            self.position(),
            egui::vec2(size.x, size.y - self.controls_height()),
        )
    }

    /// Hover and drag-start predicate.
    fn contains(&self, pointer: Pos2) -> bool {
        self.rect().contains(pointer)
    }

    /// Place the body at `offsets`. Bottom anchors grow upwards so the
    /// controls strip stays on screen.
    fn reposition(&mut self, anchor: AnchorPoint, offsets: Offsets, screen: Vec2) {
        let size = self.size();
        let strip = self.controls_height();
        let mut pos = offsets.place(egui::vec2(size.x, size.y - strip), screen);
        if anchor.is_bottom() {
            pos.y -= strip;
        }
        let pos = clamp_to_screen(pos, size, screen);
        tracing::trace!(?anchor, ?pos, "repositioning HUD");
        self.set_position(pos);
    }
}

/// Abstraction over the viewport calls so they can be recorded in tests.
pub trait ViewportCtx {
    fn send_viewport_cmd(&self, cmd: egui::ViewportCommand);
    fn request_repaint(&self);
}

impl ViewportCtx for egui::Context {
    fn send_viewport_cmd(&self, cmd: egui::ViewportCommand) {
        egui::Context::send_viewport_cmd(self, cmd);
    }

    fn request_repaint(&self) {
        egui::Context::request_repaint(self);
    }
}

/// HUD drawn in its own borderless viewport. Position and size changes are
/// forwarded as viewport commands.
pub struct ViewportHud<C: ViewportCtx> {
    ctx: C,
    pos: Pos2,
    scale: f32,
    compact: bool,
    controls_visible: bool,
}

impl<C: ViewportCtx> ViewportHud<C> {
    pub fn new(ctx: C, scale: f32, compact: bool) -> Self {
        Self {
            ctx,
            pos: Pos2::ZERO,
            scale,
            compact,
            controls_visible: false,
        }
    }

    /// Unscaled HUD sized per the engine settings. The engine rethemes it to
    /// the restored scale on startup.
    pub fn from_settings(ctx: C, settings: &HudSettings) -> Self {
        Self::new(ctx, 1.0, settings.compact)
    }

    pub fn ctx(&self) -> &C {
        &self.ctx
    }
}

impl<C: ViewportCtx> HudWidget for ViewportHud<C> {
    fn size(&self) -> Vec2 {
        hud_size(self.scale, self.compact) + egui::vec2(0.0, self.controls_height())
    }

    fn position(&self) -> Pos2 {
        self.pos
    }

    fn set_position(&mut self, pos: Pos2) {
        if pos == self.pos {
            return;
        }
        self.pos = pos;
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::OuterPosition(pos));
    }

    fn retheme(&mut self, scale: f32) {
        self.scale = scale;
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::InnerSize(self.size()));
        self.ctx.request_repaint();
    }

    fn set_controls_visible(&mut self, visible: bool) {
        if visible == self.controls_visible {
            return;
        }
        self.controls_visible = visible;
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::InnerSize(self.size()));
        self.ctx.request_repaint();
    }

    fn controls_height(&self) -> f32 {
        if self.controls_visible {
            CONTROLS_HEIGHT * self.scale
        } else {
            0.0
        }
    }
}
