use crate::anchor::Offsets;
use crate::backing::SettingsBacking;
use crate::config::mirror::PersistedRecord;
use crate::config::record::{ConfigRecord, FieldValue, TrackedField};
use std::collections::{HashMap, HashSet};

/// Outcome of comparing a persisted value against the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Keep,
    AdoptFile,
}

/// Precedence between the live value and the file.
///
/// A field still at its default is assumed untouched, so a non-default file
/// value wins, unless the user set that default on purpose this session.
/// Two differing non-default values resolve in favour of the file. A default
/// in the file never overrides a live non-default value.
pub fn resolve(
    current: FieldValue,
    file: Option<FieldValue>,
    default: FieldValue,
    explicit: bool,
) -> Resolution {
    let Some(file) = file else {
        return Resolution::Keep;
    };
    let current_is_default = current.same_as(default);
    let file_is_default = file.same_as(default);
    if current_is_default && !file_is_default {
        return if explicit {
            Resolution::Keep
        } else {
            Resolution::AdoptFile
        };
    }
    if !current.same_as(file) && !current_is_default && !file_is_default {
        return Resolution::AdoptFile;
    }
    Resolution::Keep
}

/// Follow-up work the caller owes after a reconciliation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncEffects {
    pub persist: bool,
    pub reposition: bool,
    pub retheme: bool,
}

impl SyncEffects {
    pub fn all() -> Self {
        Self {
            persist: true,
            reposition: true,
            retheme: true,
        }
    }

    fn for_change(field: TrackedField) -> Self {
        match field {
            TrackedField::Anchor => Self {
                persist: true,
                reposition: true,
                retheme: false,
            },
            // Size follows the scale, so the position has to be recomputed too.
            TrackedField::Scale => Self::all(),
            _ => Self {
                persist: true,
                reposition: false,
                retheme: false,
            },
        }
    }

    pub fn merge(&mut self, other: SyncEffects) {
        self.persist |= other.persist;
        self.reposition |= other.reposition;
        self.retheme |= other.retheme;
    }

    pub fn is_empty(&self) -> bool {
        *self == SyncEffects::default()
    }
}

/// Which periodic jobs are due on the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    pub sweep_due: bool,
    pub flush_due: bool,
}

/// Keeps the settings GUI, the record and the persisted file in agreement.
///
/// `check_drift` runs every tick against the GUI's raw values; `sweep` runs
/// at the slower cadence against a file snapshot.
#[derive(Debug)]
pub struct Reconciler {
    observed: HashMap<TrackedField, FieldValue>,
    explicit: HashSet<TrackedField>,
    ticks: u64,
    sweep_every: u64,
    flush_every: u64,
}

impl Reconciler {
    pub fn new(sweep_every: u32, flush_every: u32) -> Self {
        Self {
            observed: HashMap::new(),
            explicit: HashSet::new(),
            ticks: 0,
            sweep_every: u64::from(sweep_every.max(1)),
            flush_every: u64::from(flush_every.max(1)),
        }
    }

    /// Count a tick and report which periodic jobs fall on it. The very first
    /// tick runs both.
    pub fn advance(&mut self) -> TickSchedule {
        let tick = self.ticks;
        self.ticks += 1;
        TickSchedule {
            sweep_due: tick % self.sweep_every == 0,
            flush_due: tick % self.flush_every == 0,
        }
    }

    /// Last value seen in the settings GUI for `field`.
    pub fn observed(&self, field: TrackedField) -> Option<FieldValue> {
        self.observed.get(&field).copied()
    }

    /// Whether the user deliberately set `field` through the GUI this session.
    pub fn is_explicit(&self, field: TrackedField) -> bool {
        self.explicit.contains(&field)
    }

    /// Seed the observed cache from the GUI and bring the record in line with
    /// it. Unreadable fields fall back to the record.
    pub fn prime(&mut self, record: &mut ConfigRecord, backing: &mut dyn SettingsBacking) {
        for field in TrackedField::ALL {
            let value = match backing.read_raw(field) {
                Ok(raw) => {
                    let value = field.normalize(raw);
                    if !value.same_as(raw) {
                        if let Err(err) = backing.write_raw(field, value) {
                            tracing::warn!(?err, ?field, "failed to write clamped value back");
                        }
                    }
                    value
                }
                Err(err) => {
                    tracing::debug!(?err, ?field, "settings value unreadable; using record");
                    record.get(field)
                }
            };
            record.set(field, value);
            self.observed.insert(field, value);
        }
    }

    /// Adopt everything the file has an opinion on, unconditionally. Used once
    /// at startup before any tick has run and before the widget is placed.
    pub fn restore(
        &mut self,
        record: &mut ConfigRecord,
        backing: &mut dyn SettingsBacking,
        file: &PersistedRecord,
    ) {
        for field in TrackedField::ALL {
            let Some(value) = file.get(field).map(|v| field.normalize(v)) else {
                continue;
            };
            record.set(field, value);
            if let Err(err) = backing.write_raw(field, value) {
                tracing::warn!(?err, ?field, "failed to push restored value to settings");
            }
            self.observed.insert(field, value);
        }
        // Offsets come after the anchor, whose setter resets them.
        if let (Some(x), Some(y)) = (file.x_offset, file.y_offset) {
            record.set_offsets(Offsets::new(x, y));
        }
        if let Some(controls) = file.controls {
            record.controls_enabled = controls;
        }
        if let Some(streamer_mode) = file.streamer_mode {
            record.streamer_mode = streamer_mode;
        }
    }

    /// Handle fields whose GUI change hook fired. These count as deliberate
    /// edits.
    pub fn apply_hooks(
        &mut self,
        record: &mut ConfigRecord,
        backing: &mut dyn SettingsBacking,
    ) -> SyncEffects {
        let mut effects = SyncEffects::default();
        let mut fields = backing.take_hook_events();
        fields.dedup();
        for field in fields {
            self.explicit.insert(field);
            match backing.read_raw(field) {
                Ok(now) => effects.merge(self.absorb(field, now, record, backing)),
                Err(err) => {
                    tracing::debug!(?err, ?field, "hook fired but value is unreadable");
                }
            }
        }
        effects
    }

    /// Compare every field's raw GUI value with what was seen last tick and
    /// take any change as authoritative.
    pub fn check_drift(
        &mut self,
        record: &mut ConfigRecord,
        backing: &mut dyn SettingsBacking,
    ) -> SyncEffects {
        let mut effects = SyncEffects::default();
        for field in TrackedField::ALL {
            let cached = self.observed(field);
            let now = match backing.read_raw(field) {
                Ok(value) => value,
                Err(err) => {
                    tracing::debug!(?err, ?field, "settings value unreadable; keeping cached");
                    continue;
                }
            };
            if cached.is_some_and(|c| c.same_as(now)) {
                continue;
            }
            tracing::debug!(?field, from = ?cached, to = %now, "settings value drifted");
            effects.merge(self.absorb(field, now, record, backing));
        }
        effects
    }

    fn absorb(
        &mut self,
        field: TrackedField,
        now: FieldValue,
        record: &mut ConfigRecord,
        backing: &mut dyn SettingsBacking,
    ) -> SyncEffects {
        let value = field.normalize(now);
        if !value.same_as(now) {
            // Keep the GUI inside the valid range as well.
            if let Err(err) = backing.write_raw(field, value) {
                tracing::warn!(?err, ?field, "failed to write clamped value back");
            }
        }
        self.observed.insert(field, value);
        record.set(field, value);
        SyncEffects::for_change(field)
    }

    /// One full pass of the file precedence rules over every tracked field.
    pub fn sweep(
        &mut self,
        record: &mut ConfigRecord,
        backing: &mut dyn SettingsBacking,
        file: &PersistedRecord,
    ) -> SyncEffects {
        let mut effects = SyncEffects::default();
        for field in TrackedField::ALL {
            let file_value = file.get(field).map(|v| field.normalize(v));
            let current = match backing.read_raw(field) {
                Ok(value) => field.normalize(value),
                Err(err) => {
                    tracing::debug!(?err, ?field, "settings value unreadable; using record");
                    record.get(field)
                }
            };
            let resolution = resolve(
                current,
                file_value,
                field.default_value(),
                self.is_explicit(field),
            );
            let (Resolution::AdoptFile, Some(value)) = (resolution, file_value) else {
                continue;
            };
            tracing::debug!(?field, from = %current, to = %value, "restoring value from file");
            record.set(field, value);
            if let Err(err) = backing.write_raw(field, value) {
                tracing::warn!(?err, ?field, "failed to push restored value to settings");
            }
            self.observed.insert(field, value);
            effects = SyncEffects::all();
        }
        effects
    }

    /// Record a change the engine itself made (drag, programmatic anchor) so
    /// the GUI shows it and the next drift check does not mistake it for a
    /// GUI edit.
    pub fn note_engine_write(
        &mut self,
        backing: &mut dyn SettingsBacking,
        field: TrackedField,
        value: FieldValue,
    ) {
        let value = field.normalize(value);
        if let Err(err) = backing.write_raw(field, value) {
            tracing::warn!(?err, ?field, "failed to push value to settings");
        }
        self.observed.insert(field, value);
    }
}
