use eframe::egui::{self, PointerButton};
use hud_anchor::anchor::AnchorPoint;
use hud_anchor::backing::SharedBacking;
use hud_anchor::config::{ConfigStorage, FieldValue, MemoryStorage, ScreenKind, TrackedField};
use hud_anchor::playback::{PlaybackService, PlaybackState};
use hud_anchor::settings::HudSettings;
use hud_anchor::widget::ViewportHud;
use hud_anchor::HudEngine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::tempdir;

use mock_ctx::MockCtx;

const SCREEN: egui::Vec2 = egui::vec2(800.0, 600.0);

fn fast_settings() -> HudSettings {
    HudSettings {
        sweep_interval_ticks: 1,
        ..HudSettings::default()
    }
}

fn engine_with(storage: &MemoryStorage, backing: &SharedBacking, ctx: &MockCtx) -> HudEngine {
    HudEngine::new(
        fast_settings(),
        Box::new(storage.clone()),
        Box::new(backing.clone()),
        Box::new(ViewportHud::new(ctx.clone(), 1.0, false)),
        None,
        SCREEN,
    )
}

/// Tick until `done` holds or two seconds pass.
fn tick_until(engine: &mut HudEngine, mut done: impl FnMut(&HudEngine) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        engine.tick();
        if done(engine) {
            return true;
        }
        sleep(Duration::from_millis(5));
    }
    false
}

fn wait_for_contents(storage: &MemoryStorage, needle: &str) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if storage.contents().is_some_and(|c| c.contains(needle)) {
            return true;
        }
        sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn first_run_writes_defaults() {
    let storage = MemoryStorage::default();
    let backing = SharedBacking::new();
    let engine = engine_with(&storage, &backing, &MockCtx::default());
    engine.shutdown();

    let contents = storage.contents().expect("defaults written");
    assert!(contents.contains("anchor_point = 0"));
    assert!(contents.contains("hud_scale = 1"));
}

#[test]
fn startup_restores_file_into_record_and_settings() {
    let storage = MemoryStorage::with_contents("anchor_point = 7\n'hud_scale' = \"2\"\n");
    let backing = SharedBacking::new();
    let ctx = MockCtx::default();
    let engine = engine_with(&storage, &backing, &ctx);

    assert_eq!(engine.record().anchor(), AnchorPoint::BottomRight);
    assert_eq!(engine.record().scale(), 2.0);
    assert_eq!(
        backing.value(TrackedField::Anchor),
        Some(FieldValue::Ordinal(7))
    );
    assert_eq!(ctx.last_size(), Some(egui::vec2(300.0, 100.0)));
    assert_eq!(ctx.last_position(), Some(egui::pos2(500.0, 500.0)));
    assert_eq!(storage.write_count(), 0);
}

#[test]
fn startup_restores_exact_offsets_after_anchor() {
    let storage =
        MemoryStorage::with_contents("anchor_point = 1\nx_offset = 0.4\ny_offset = 0.1\n");
    let engine = engine_with(&storage, &SharedBacking::new(), &MockCtx::default());
    let offsets = engine.record().offsets();
    assert_eq!(engine.record().anchor(), AnchorPoint::TopMiddle);
    assert!((offsets.x - 0.4).abs() < 1e-6);
    assert!((offsets.y - 0.1).abs() < 1e-6);
}

#[test]
fn gui_change_is_persisted() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let backing = SharedBacking::new();
    let ctx = MockCtx::default();
    let mut engine = engine_with(&storage, &backing, &ctx);

    backing.set_silently(TrackedField::Scale, FieldValue::Scale(1.5));
    engine.tick();
    assert_eq!(engine.record().scale(), 1.5);
    assert_eq!(ctx.last_size(), Some(egui::vec2(225.0, 75.0)));
    assert!(wait_for_contents(&storage, "hud_scale = 1.5"));
}

#[test]
fn out_of_range_gui_value_is_clamped_everywhere() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let backing = SharedBacking::new();
    let mut engine = engine_with(&storage, &backing, &MockCtx::default());

    backing.set_silently(TrackedField::DisplayMode, FieldValue::Ordinal(42));
    engine.tick();
    assert_eq!(
        engine.record().ordinal(TrackedField::DisplayMode),
        Some(2)
    );
    assert_eq!(
        backing.value(TrackedField::DisplayMode),
        Some(FieldValue::Ordinal(2))
    );
}

#[test]
fn external_edit_is_adopted_by_sweep() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let backing = SharedBacking::new();
    let mut engine = engine_with(&storage, &backing, &MockCtx::default());

    storage.replace("anchor_point = 4\n");
    assert!(tick_until(&mut engine, |e| e.record().anchor()
        == AnchorPoint::MiddleRight));
    assert_eq!(
        backing.value(TrackedField::Anchor),
        Some(FieldValue::Ordinal(4))
    );
}

#[test]
fn default_in_file_does_not_override_live_value() {
    let storage = MemoryStorage::with_contents("link_mode = 1\n");
    let backing = SharedBacking::new();
    let mut engine = engine_with(&storage, &backing, &MockCtx::default());

    storage.replace("link_mode = 0\n");
    for _ in 0..20 {
        engine.tick();
        sleep(Duration::from_millis(2));
    }
    assert_eq!(engine.record().ordinal(TrackedField::LinkMode), Some(1));
}

#[test]
fn explicit_default_survives_external_edit() {
    let storage = MemoryStorage::with_contents("render_type = 2\n");
    let backing = SharedBacking::new();
    let mut engine = engine_with(&storage, &backing, &MockCtx::default());

    backing.set_with_hook(TrackedField::RenderType, FieldValue::Ordinal(0));
    engine.tick();
    assert!(wait_for_contents(&storage, "render_type = 0"));

    storage.replace("render_type = 2\n");
    for _ in 0..20 {
        engine.tick();
        sleep(Duration::from_millis(2));
    }
    assert_eq!(engine.record().ordinal(TrackedField::RenderType), Some(0));
}

#[test]
fn sweep_is_idempotent() {
    let storage = MemoryStorage::with_contents("anchor_point = 3\nhud_scale = 0.75\n");
    let backing = SharedBacking::new();
    let mut engine = engine_with(&storage, &backing, &MockCtx::default());
    let before = engine.record().clone();
    for _ in 0..20 {
        engine.tick();
        sleep(Duration::from_millis(2));
    }
    assert_eq!(engine.record(), &before);
    assert_eq!(storage.write_count(), 0);
}

#[test]
fn drag_moves_and_classifies_on_release() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let backing = SharedBacking::new();
    let ctx = MockCtx::default();
    let mut engine = engine_with(&storage, &backing, &ctx);
    engine.set_edit_mode(true);

    assert!(engine.on_pointer_pressed(PointerButton::Primary, egui::pos2(10.0, 10.0)));
    engine.on_frame(Some(egui::pos2(710.0, 560.0)), true);
    assert_eq!(ctx.last_position(), Some(egui::pos2(650.0, 550.0)));

    engine.on_pointer_released(PointerButton::Primary);
    assert_eq!(engine.record().anchor(), AnchorPoint::BottomRight);
    assert_eq!(
        backing.value(TrackedField::Anchor),
        Some(FieldValue::Ordinal(7))
    );
    assert!(wait_for_contents(&storage, "anchor_point = 7"));
}

#[test]
fn button_seen_up_mid_drag_releases() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let mut engine = engine_with(&storage, &SharedBacking::new(), &MockCtx::default());
    engine.set_edit_mode(true);

    engine.on_pointer_pressed(PointerButton::Primary, egui::pos2(20.0, 20.0));
    engine.on_frame(Some(egui::pos2(420.0, 20.0)), true);
    engine.on_frame(Some(egui::pos2(420.0, 20.0)), false);
    assert_eq!(engine.record().anchor(), AnchorPoint::TopMiddle);
    assert!(!engine.on_pointer_pressed(PointerButton::Secondary, egui::pos2(420.0, 20.0)));
}

#[test]
fn small_drop_is_not_persisted() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let mut engine = engine_with(&storage, &SharedBacking::new(), &MockCtx::default());
    engine.set_edit_mode(true);

    // The first drop stores exact offsets; a one pixel nudge stays inside the tolerance.
    engine.on_pointer_pressed(PointerButton::Primary, egui::pos2(10.0, 10.0));
    engine.on_frame(Some(egui::pos2(10.0, 10.0)), true);
    engine.on_pointer_released(PointerButton::Primary);
    engine.on_pointer_pressed(PointerButton::Primary, egui::pos2(10.0, 10.0));
    engine.on_frame(Some(egui::pos2(11.0, 10.0)), true);
    engine.on_pointer_released(PointerButton::Primary);

    assert!(!engine.has_pending_write());
}

#[test]
fn drag_needs_edit_mode() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let mut engine = engine_with(&storage, &SharedBacking::new(), &MockCtx::default());
    assert!(!engine.on_pointer_pressed(PointerButton::Primary, egui::pos2(10.0, 10.0)));
}

#[test]
fn anchor_change_is_ignored_while_dragging() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let mut engine = engine_with(&storage, &SharedBacking::new(), &MockCtx::default());
    engine.set_edit_mode(true);
    engine.on_pointer_pressed(PointerButton::Primary, egui::pos2(10.0, 10.0));
    engine.set_anchor(AnchorPoint::BottomLeft);
    assert_eq!(engine.record().anchor(), AnchorPoint::TopLeft);

    engine.set_edit_mode(false);
    engine.set_anchor(AnchorPoint::BottomLeft);
    assert_eq!(engine.record().anchor(), AnchorPoint::BottomLeft);
    assert_eq!(
        engine.record().offsets(),
        AnchorPoint::BottomLeft.default_offsets()
    );
}

#[test]
fn settings_closed_saves_immediately() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let backing = SharedBacking::new();
    let mut engine = engine_with(&storage, &backing, &MockCtx::default());

    backing.set_silently(TrackedField::Anchor, FieldValue::Ordinal(6));
    engine.on_settings_closed();
    assert_eq!(engine.record().anchor(), AnchorPoint::BottomMiddle);
    assert!(wait_for_contents(&storage, "anchor_point = 6"));
}

#[test]
fn render_gate_follows_modes() {
    let storage = MemoryStorage::with_contents("render_type = 2\ndisplay_mode = 1\n");
    let mut engine = engine_with(&storage, &SharedBacking::new(), &MockCtx::default());
    let playing = PlaybackState {
        title: "Song".into(),
        is_playing: true,
        ..PlaybackState::default()
    };
    let paused = PlaybackState {
        is_playing: false,
        ..playing.clone()
    };

    assert!(engine.should_render(ScreenKind::Game, Some(&playing)));
    assert!(!engine.should_render(ScreenKind::Chat, Some(&playing)));
    assert!(!engine.should_render(ScreenKind::Game, Some(&paused)));

    engine.toggle_hidden();
    assert!(!engine.should_render(ScreenKind::Game, Some(&playing)));
    engine.toggle_hidden();

    engine.set_edit_mode(true);
    assert!(engine.should_render(ScreenKind::Menu, None));
}

/// Readable store whose writes always fail, e.g. a file on a full disk.
#[derive(Clone, Default)]
struct FailingWrites {
    contents: Arc<Mutex<String>>,
    attempts: Arc<AtomicUsize>,
}

impl ConfigStorage for FailingWrites {
    fn read_raw(&self) -> anyhow::Result<Option<String>> {
        Ok(Some(self.contents.lock().unwrap().clone()))
    }

    fn write_raw(&self, _contents: &str) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("disk full")
    }
}

#[test]
fn failed_write_still_adopts_external_edits_and_backs_off() {
    let storage = FailingWrites::default();
    *storage.contents.lock().unwrap() = "anchor_point = 0\n".into();
    let backing = SharedBacking::new();
    let settings = HudSettings {
        sweep_interval_ticks: 5,
        ..HudSettings::default()
    };
    let mut engine = HudEngine::new(
        settings,
        Box::new(storage.clone()),
        Box::new(backing.clone()),
        Box::new(ViewportHud::new(MockCtx::default(), 1.0, false)),
        None,
        SCREEN,
    );

    backing.set_silently(TrackedField::LinkMode, FieldValue::Ordinal(1));
    engine.tick();
    *storage.contents.lock().unwrap() = "anchor_point = 4\n".into();
    for _ in 0..100 {
        engine.tick();
        sleep(Duration::from_millis(2));
    }

    assert_eq!(engine.record().anchor(), AnchorPoint::MiddleRight);
    assert_eq!(engine.record().ordinal(TrackedField::LinkMode), Some(1));
    let attempts = storage.attempts.load(Ordering::SeqCst);
    assert!(attempts >= 2, "failed write was never retried");
    assert!(attempts <= 30, "{attempts} write attempts in 101 ticks");
}

#[test]
fn press_on_controls_strip_does_not_drag() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let ctx = MockCtx::default();
    let mut engine = engine_with(&storage, &SharedBacking::new(), &ctx);
    engine.set_controls_enabled(true);
    engine.set_edit_mode(true);

    engine.on_frame(Some(egui::pos2(20.0, 20.0)), false);
    assert_eq!(ctx.last_size(), Some(egui::vec2(150.0, 63.0)));
    assert_eq!(engine.widget_rect().height(), 63.0);

    assert!(!engine.on_pointer_pressed(PointerButton::Primary, egui::pos2(20.0, 55.0)));
    assert!(engine.on_pointer_pressed(PointerButton::Primary, egui::pos2(20.0, 20.0)));
}

#[test]
fn controls_strip_needs_hover_and_flag() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let ctx = MockCtx::default();
    let mut engine = engine_with(&storage, &SharedBacking::new(), &ctx);

    engine.on_frame(Some(egui::pos2(20.0, 20.0)), false);
    assert_eq!(engine.widget_rect().height(), 50.0);

    engine.set_controls_enabled(true);
    engine.on_frame(Some(egui::pos2(20.0, 20.0)), false);
    assert_eq!(engine.widget_rect().height(), 63.0);
    engine.set_controls_enabled(false);
    assert_eq!(engine.widget_rect().height(), 50.0);
    assert_eq!(ctx.last_size(), Some(egui::vec2(150.0, 50.0)));
}

#[test]
fn bottom_anchor_grows_upwards_for_controls() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let mut engine = engine_with(&storage, &SharedBacking::new(), &MockCtx::default());
    engine.set_controls_enabled(true);
    engine.set_anchor(AnchorPoint::BottomLeft);
    assert_eq!(engine.widget_rect().min.y, 550.0);

    engine.on_frame(Some(egui::pos2(10.0, 560.0)), false);
    assert_eq!(engine.widget_rect().min.y, 537.0);
    assert_eq!(engine.widget_rect().max.y, 600.0);

    engine.on_frame(None, false);
    assert_eq!(engine.widget_rect().min.y, 550.0);
}

#[test]
fn resize_mid_drag_cancels_it() {
    let storage = MemoryStorage::with_contents("anchor_point = 0\n");
    let mut engine = engine_with(&storage, &SharedBacking::new(), &MockCtx::default());
    engine.set_edit_mode(true);

    engine.on_pointer_pressed(PointerButton::Primary, egui::pos2(10.0, 10.0));
    engine.on_frame(Some(egui::pos2(410.0, 310.0)), true);
    engine.set_screen_size(egui::vec2(1000.0, 800.0));
    assert_eq!(engine.widget_rect().min, egui::pos2(0.0, 0.0));

    engine.on_pointer_released(PointerButton::Primary);
    assert_eq!(engine.record().anchor(), AnchorPoint::TopLeft);
    assert!(!engine.has_pending_write());
}

struct Player {
    state: Option<PlaybackState>,
}

impl PlaybackService for Player {
    fn state(&self) -> Option<PlaybackState> {
        self.state.clone()
    }
}

#[test]
fn file_backed_engine_writes_defaults_and_gates_on_service_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hud").join("hud.cfg");
    let settings = HudSettings {
        config_path: path.to_string_lossy().into_owned(),
        ..fast_settings()
    };
    let playing = Player {
        state: Some(PlaybackState {
            title: "Song".into(),
            is_playing: true,
            ..PlaybackState::default()
        }),
    };
    let idle = Player { state: None };

    let mut engine = HudEngine::with_file(
        settings,
        Box::new(SharedBacking::new()),
        Box::new(ViewportHud::new(MockCtx::default(), 1.0, false)),
        &idle,
        SCREEN,
    );
    engine.set_edit_mode(true);
    assert!(engine.should_render_for(ScreenKind::Menu, &idle));
    engine.set_edit_mode(false);
    engine.toggle_hidden();
    assert!(!engine.should_render_for(ScreenKind::Game, &playing));
    engine.shutdown();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("anchor_point = 0"));

    std::fs::write(&path, "render_type = 2\ndisplay_mode = 1\n").unwrap();
    let engine = HudEngine::with_file(
        HudSettings {
            config_path: path.to_string_lossy().into_owned(),
            ..fast_settings()
        },
        Box::new(SharedBacking::new()),
        Box::new(ViewportHud::new(MockCtx::default(), 1.0, false)),
        &playing,
        SCREEN,
    );
    assert!(engine.should_render_for(ScreenKind::Game, &playing));
    assert!(!engine.should_render_for(ScreenKind::Game, &idle));
}
