use crate::anchor::AnchorPoint;
use crate::backing::SettingsBacking;
use crate::config::mirror;
use crate::config::modes::{Ordinal, ScreenKind};
use crate::config::record::{ConfigRecord, FieldValue, TrackedField};
use crate::config::store::{ConfigStorage, FileStorage, PersistWorker};
use crate::drag::DragAnchorResolver;
use crate::playback::{
    PlaybackService, PlaybackState, ProgressScrubber, SeekDispatcher, Seekable,
};
use crate::reconcile::{Reconciler, SyncEffects};
use crate::settings::HudSettings;
use crate::widget::HudWidget;
use eframe::egui::{PointerButton, Pos2, Rect, Vec2};
use std::sync::Arc;
use std::time::Instant;

/// Owns the HUD's configuration state and everything that keeps it
/// consistent. Built once at startup and driven from the host's tick and
/// input callbacks, all on one thread.
pub struct HudEngine {
    settings: HudSettings,
    record: ConfigRecord,
    backing: Box<dyn SettingsBacking>,
    widget: Box<dyn HudWidget>,
    reconciler: Reconciler,
    drag: DragAnchorResolver,
    store: PersistWorker,
    scrubber: ProgressScrubber,
    seeks: SeekDispatcher,
    screen: Vec2,
    hidden: bool,
}

impl HudEngine {
    /// Restore the persisted record, sync the settings GUI to it and place
    /// the widget. The first read is synchronous; everything after goes
    /// through the background worker.
    pub fn new(
        settings: HudSettings,
        storage: Box<dyn ConfigStorage>,
        mut backing: Box<dyn SettingsBacking>,
        mut widget: Box<dyn HudWidget>,
        seeker: Option<Arc<dyn Seekable>>,
        screen: Vec2,
    ) -> Self {
        let mut record = ConfigRecord::default();
        let mut reconciler =
            Reconciler::new(settings.sweep_interval_ticks, settings.flush_interval_ticks);

        let first_run = match storage.read_raw() {
            Ok(Some(raw)) => {
                let file = mirror::parse(&raw);
                reconciler.restore(&mut record, backing.as_mut(), &file);
                tracing::info!(
                    anchor = %record.anchor(),
                    scale = record.scale(),
                    "restored HUD config"
                );
                false
            }
            Ok(None) => true,
            Err(err) => {
                tracing::warn!(?err, "could not read HUD config; starting from defaults");
                false
            }
        };
        reconciler.prime(&mut record, backing.as_mut());

        widget.retheme(record.scale());
        widget.reposition(record.anchor(), record.offsets(), screen);

        let mut store = PersistWorker::spawn(storage);
        if first_run {
            tracing::info!("no HUD config found; writing defaults");
            store.mark_dirty();
            store.flush(&record);
        }

        Self {
            scrubber: ProgressScrubber::new(settings.seek_throttle()),
            drag: DragAnchorResolver::new(settings.offset_epsilon),
            settings,
            record,
            backing,
            widget,
            reconciler,
            store,
            seeks: SeekDispatcher::new(seeker),
            screen,
            hidden: false,
        }
    }

    /// Engine persisting to the file named in `settings`.
    pub fn with_file(
        settings: HudSettings,
        backing: Box<dyn SettingsBacking>,
        widget: Box<dyn HudWidget>,
        playback: &dyn PlaybackService,
        screen: Vec2,
    ) -> Self {
        let storage = Box::new(FileStorage::new(&settings.config_path));
        let seeker = playback.seeker();
        Self::new(settings, storage, backing, widget, seeker, screen)
    }

    pub fn record(&self) -> &ConfigRecord {
        &self.record
    }

    pub fn settings(&self) -> &HudSettings {
        &self.settings
    }

    pub fn widget_rect(&self) -> Rect {
        self.widget.rect()
    }

    pub fn screen_size(&self) -> Vec2 {
        self.screen
    }

    /// Whether a record change is waiting to be written.
    pub fn has_pending_write(&self) -> bool {
        self.store.is_dirty()
    }

    /// One pass of the reconciliation loop. Call once per host tick.
    pub fn tick(&mut self) {
        let schedule = self.reconciler.advance();

        let mut effects = self
            .reconciler
            .apply_hooks(&mut self.record, self.backing.as_mut());
        effects.merge(
            self.reconciler
                .check_drift(&mut self.record, self.backing.as_mut()),
        );
        self.apply(effects);

        if schedule.sweep_due {
            // A failed write is retried ahead of the read so the snapshot
            // reflects it.
            self.store.retry_failed(&self.record);
            self.store.request_read();
        }
        if let Some(snapshot) = self.store.poll() {
            match snapshot.record {
                Some(file) if !self.store.is_dirty() => {
                    let record = &mut self.record;
                    let effects = self.reconciler.sweep(record, self.backing.as_mut(), &file);
                    self.apply(effects);
                }
                Some(_) => tracing::trace!("record dirty; skipping sweep"),
                None => {}
            }
        }

        if schedule.flush_due {
            self.store.flush(&self.record);
        }
    }

    fn apply(&mut self, effects: SyncEffects) {
        if effects.is_empty() {
            return;
        }
        if effects.persist {
            self.store.mark_dirty();
        }
        if effects.retheme {
            self.widget.retheme(self.record.scale());
        }
        if effects.reposition {
            self.reposition();
        }
    }

    fn reposition(&mut self) {
        if self.drag.is_dragging() {
            tracing::trace!("drag in progress; ignoring reposition");
            return;
        }
        self.widget
            .reposition(self.record.anchor(), self.record.offsets(), self.screen);
    }

    /// The settings screen closed: pick up anything it changed, save and
    /// re-read the file.
    pub fn on_settings_closed(&mut self) {
        let mut effects = self
            .reconciler
            .apply_hooks(&mut self.record, self.backing.as_mut());
        effects.merge(
            self.reconciler
                .check_drift(&mut self.record, self.backing.as_mut()),
        );
        effects.merge(SyncEffects::all());
        self.apply(effects);
        self.store.flush(&self.record);
        self.store.request_read();
    }

    /// A resize mid-drag abandons the drag, since its offsets were measured
    /// against the old screen.
    pub fn set_screen_size(&mut self, screen: Vec2) {
        if screen == self.screen {
            return;
        }
        self.screen = screen;
        if self.drag.cancel() {
            tracing::debug!(?screen, "screen resized mid-drag; drag cancelled");
        }
        self.reposition();
    }

    /// Select an anchor programmatically. Offsets return to the anchor's
    /// defaults.
    pub fn set_anchor(&mut self, anchor: AnchorPoint) {
        if self.drag.is_dragging() {
            tracing::debug!(?anchor, "ignoring anchor change during drag");
            return;
        }
        self.record.place(anchor, anchor.default_offsets());
        self.reconciler.note_engine_write(
            self.backing.as_mut(),
            TrackedField::Anchor,
            FieldValue::Ordinal(anchor.ordinal()),
        );
        self.store.mark_dirty();
        self.reposition();
    }

    pub fn set_scale(&mut self, scale: f32) {
        if !self.record.set_scale(scale) {
            return;
        }
        self.reconciler.note_engine_write(
            self.backing.as_mut(),
            TrackedField::Scale,
            FieldValue::Scale(self.record.scale()),
        );
        self.apply(SyncEffects::all());
    }

    pub fn set_controls_enabled(&mut self, enabled: bool) {
        if self.record.controls_enabled != enabled {
            self.record.controls_enabled = enabled;
            self.store.mark_dirty();
        }
        if !enabled {
            self.show_controls(false);
        }
    }

    fn show_controls(&mut self, visible: bool) {
        if visible == (self.widget.controls_height() > 0.0) {
            return;
        }
        self.widget.set_controls_visible(visible);
        self.reposition();
    }

    pub fn set_streamer_mode(&mut self, enabled: bool) {
        if self.record.streamer_mode != enabled {
            self.record.streamer_mode = enabled;
            self.store.mark_dirty();
        }
    }

    pub fn is_edit_mode(&self) -> bool {
        !self.drag.is_locked()
    }

    /// Edit mode unlocks dragging. Leaving it mid-drag abandons the drag and
    /// snaps the widget back to its stored place.
    pub fn set_edit_mode(&mut self, enabled: bool) {
        let was_dragging = self.drag.is_dragging();
        self.drag.set_locked(!enabled);
        if was_dragging && !self.drag.is_dragging() {
            self.reposition();
        }
        if enabled && self.scrubber.is_scrubbing() {
            self.scrubber.release();
        }
        tracing::debug!(enabled, "HUD edit mode");
    }

    pub fn toggle_hidden(&mut self) {
        self.hidden = !self.hidden;
        tracing::debug!(hidden = self.hidden, "HUD visibility toggled");
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether the HUD should be drawn this frame. Edit mode always shows it
    /// so it can be moved.
    pub fn should_render(&self, screen: ScreenKind, playback: Option<&PlaybackState>) -> bool {
        if self.hidden {
            return false;
        }
        if self.is_edit_mode() {
            return true;
        }
        self.record.render_type().can_render(screen)
            && self.record.display_mode().can_display(playback)
    }

    /// `should_render` against the service's current playback state.
    pub fn should_render_for(&self, screen: ScreenKind, playback: &dyn PlaybackService) -> bool {
        self.should_render(screen, playback.state().as_ref())
    }

    /// Pointer button went down. Returns `true` when a drag started.
    pub fn on_pointer_pressed(&mut self, button: PointerButton, pointer: Pos2) -> bool {
        if button != PointerButton::Primary {
            return false;
        }
        let hovered = self.widget.contains(pointer);
        self.drag
            .press(pointer, self.widget.rect(), hovered, self.record.scale())
    }

    /// Per-frame pointer state. Hovering shows the controls strip when
    /// controls are enabled. Moves the widget with an active drag and
    /// finishes the drag if the button is seen up without a release event.
    pub fn on_frame(&mut self, pointer: Option<Pos2>, primary_down: bool) {
        if !self.drag.is_dragging() {
            let hovered = pointer.is_some_and(|p| self.widget.contains(p));
            self.show_controls(hovered && self.record.controls_enabled);
            return;
        }
        if !primary_down {
            tracing::debug!("primary button up mid-drag; releasing");
            self.finish_drag();
            return;
        }
        let Some(pointer) = pointer else {
            return;
        };
        if let Some(pos) = self
            .drag
            .drag_position(pointer, self.widget.size(), self.screen)
        {
            self.widget.set_position(pos);
        }
    }

    pub fn on_pointer_released(&mut self, button: PointerButton) {
        if button == PointerButton::Primary && self.drag.is_dragging() {
            self.finish_drag();
        }
    }

    fn finish_drag(&mut self) {
        let Some(release) = self
            .drag
            .release(self.widget.body_rect(), self.screen, &mut self.record)
        else {
            return;
        };
        if !release.changed {
            return;
        }
        self.reconciler.note_engine_write(
            self.backing.as_mut(),
            TrackedField::Anchor,
            FieldValue::Ordinal(release.anchor.ordinal()),
        );
        self.store.mark_dirty();
        self.store.flush(&self.record);
        tracing::info!(
            anchor = %release.anchor,
            x = release.offsets.x,
            y = release.offsets.y,
            "HUD moved"
        );
    }

    /// Scrubbing needs the controls flag, a seekable service and edit mode
    /// off.
    pub fn can_scrub(&self) -> bool {
        self.record.controls_enabled && !self.is_edit_mode() && self.seeks.is_supported()
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrubber.is_scrubbing()
    }

    /// Position the progress bar should show while scrubbing.
    pub fn scrub_preview(&self) -> Option<u32> {
        self.scrubber.preview()
    }

    /// Press on the progress bar. `relative_x` is measured from the bar's
    /// left edge.
    pub fn scrub_press(&mut self, relative_x: f32, width: f32, duration_secs: u32, now: Instant) {
        if !self.can_scrub() {
            return;
        }
        self.scrubber.set_duration(duration_secs);
        if let Some(position) = self.scrubber.press(relative_x, width, now) {
            self.seeks.dispatch(position);
        }
    }

    pub fn scrub_drag(&mut self, relative_x: f32, width: f32, now: Instant) {
        if let Some(position) = self.scrubber.drag(relative_x, width, now) {
            self.seeks.dispatch(position);
        }
    }

    pub fn scrub_release(&mut self) {
        if let Some(position) = self.scrubber.release() {
            self.seeks.dispatch(position);
        }
    }

    /// Write any pending change and stop the background workers.
    pub fn shutdown(mut self) {
        self.store.shutdown(&self.record);
    }
}

impl Drop for HudEngine {
    fn drop(&mut self) {
        self.store.flush(&self.record);
    }
}
