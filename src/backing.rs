use crate::config::record::{FieldValue, TrackedField, DEFAULT_SCALE};
use std::sync::{Arc, Mutex};

/// Contract with the settings GUI that owns the user-facing copies of the
/// tracked fields.
///
/// The GUI may overwrite its values without firing any hook, so the engine
/// polls `read_raw` every tick. Hooks that do fire are drained through
/// `take_hook_events` and mark the change as a deliberate user edit.
pub trait SettingsBacking {
    /// Current raw value of `field`, read without going through the GUI's
    /// change hooks.
    fn read_raw(&self, field: TrackedField) -> anyhow::Result<FieldValue>;

    /// Overwrite the GUI's value, e.g. after a restore from file.
    fn write_raw(&mut self, field: TrackedField, value: FieldValue) -> anyhow::Result<()>;

    /// Fields whose change hook fired since the last call.
    fn take_hook_events(&mut self) -> Vec<TrackedField> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct BackingValues {
    anchor_point: i64,
    link_mode: i64,
    render_type: i64,
    display_mode: i64,
    hud_scale: f32,
    hooks: Vec<TrackedField>,
}

impl Default for BackingValues {
    fn default() -> Self {
        Self {
            anchor_point: 0,
            link_mode: 0,
            render_type: 0,
            display_mode: 0,
            hud_scale: DEFAULT_SCALE,
            hooks: Vec::new(),
        }
    }
}

impl BackingValues {
    fn get(&self, field: TrackedField) -> FieldValue {
        match field {
            TrackedField::Anchor => FieldValue::Ordinal(self.anchor_point),
            TrackedField::LinkMode => FieldValue::Ordinal(self.link_mode),
            TrackedField::RenderType => FieldValue::Ordinal(self.render_type),
            TrackedField::DisplayMode => FieldValue::Ordinal(self.display_mode),
            TrackedField::Scale => FieldValue::Scale(self.hud_scale),
        }
    }

    fn set(&mut self, field: TrackedField, value: FieldValue) {
        match (field, value) {
            (TrackedField::Scale, FieldValue::Scale(s)) => self.hud_scale = s,
            (TrackedField::Scale, FieldValue::Ordinal(o)) => self.hud_scale = o as f32,
            (_, FieldValue::Scale(s)) => self.set(field, FieldValue::Ordinal(s.round() as i64)),
            (TrackedField::Anchor, FieldValue::Ordinal(o)) => self.anchor_point = o,
            (TrackedField::LinkMode, FieldValue::Ordinal(o)) => self.link_mode = o,
            (TrackedField::RenderType, FieldValue::Ordinal(o)) => self.render_type = o,
            (TrackedField::DisplayMode, FieldValue::Ordinal(o)) => self.display_mode = o,
        }
    }
}

/// Shared, lock-protected backing store for hosts whose settings GUI binds
/// straight to plain fields. Clones share the same values, so the GUI side
/// keeps one handle and the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct SharedBacking {
    values: Arc<Mutex<BackingValues>>,
}

impl SharedBacking {
    pub fn new() -> Self {
        Self::default()
    }

    /// GUI-side write that bypasses every hook.
    pub fn set_silently(&self, field: TrackedField, value: FieldValue) {
        if let Ok(mut values) = self.values.lock() {
            values.set(field, value);
        }
    }

    /// GUI-side write that also fires the field's change hook.
    pub fn set_with_hook(&self, field: TrackedField, value: FieldValue) {
        if let Ok(mut values) = self.values.lock() {
            values.set(field, value);
            values.hooks.push(field);
        }
    }

    /// Value as the GUI currently shows it.
    pub fn value(&self, field: TrackedField) -> Option<FieldValue> {
        self.values.lock().ok().map(|v| v.get(field))
    }
}

impl SettingsBacking for SharedBacking {
    fn read_raw(&self, field: TrackedField) -> anyhow::Result<FieldValue> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("settings backing lock poisoned"))?;
        Ok(values.get(field))
    }

    fn write_raw(&mut self, field: TrackedField, value: FieldValue) -> anyhow::Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("settings backing lock poisoned"))?;
        values.set(field, value);
        Ok(())
    }

    fn take_hook_events(&mut self) -> Vec<TrackedField> {
        match self.values.lock() {
            Ok(mut values) => std::mem::take(&mut values.hooks),
            Err(_) => Vec::new(),
        }
    }
}
