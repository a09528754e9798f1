use crate::anchor::{AnchorPoint, Offsets};
use crate::config::modes::{clamp_ordinal, DisplayMode, LinkMode, Ordinal, RenderType};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 5.0;
pub const DEFAULT_SCALE: f32 = 1.0;

/// Scale values closer than this are treated as equal.
pub const SCALE_EPSILON: f32 = 0.001;

/// Ordinal-backed enumerated setting. The derived value is always the
/// variant at the clamped ordinal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigField<T: Ordinal> {
    ordinal: i64,
    value: T,
}

impl<T: Ordinal> ConfigField<T> {
    pub fn new(ordinal: i64) -> Self {
        let ordinal = clamp_ordinal::<T>(ordinal);
        Self {
            ordinal,
            value: T::from_ordinal(ordinal),
        }
    }

    pub fn ordinal(&self) -> i64 {
        self.ordinal
    }

    pub fn value(&self) -> T {
        self.value
    }

    /// Store `ordinal` clamped to the variant range. Returns whether the
    /// stored ordinal changed.
    pub fn set_ordinal(&mut self, ordinal: i64) -> bool {
        let next = clamp_ordinal::<T>(ordinal);
        let changed = next != self.ordinal;
        self.ordinal = next;
        self.value = T::from_ordinal(next);
        changed
    }
}

impl<T: Ordinal> Default for ConfigField<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

/// HUD scale factor, always within `[MIN_SCALE, MAX_SCALE]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleField(f32);

impl ScaleField {
    pub fn new(scale: f32) -> Self {
        Self(clamp_scale(scale))
    }

    pub fn get(&self) -> f32 {
        self.0
    }

    pub fn set(&mut self, scale: f32) -> bool {
        let next = clamp_scale(scale);
        let changed = (next - self.0).abs() > SCALE_EPSILON;
        self.0 = next;
        changed
    }
}

impl Default for ScaleField {
    fn default() -> Self {
        Self(DEFAULT_SCALE)
    }
}

/// Clamp a scale into range. NaN falls back to the default.
pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        DEFAULT_SCALE
    } else {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }
}

/// Settings the reconciler keeps in agreement across file, record and the
/// settings GUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    Anchor,
    LinkMode,
    RenderType,
    DisplayMode,
    Scale,
}

impl TrackedField {
    pub const ALL: [TrackedField; 5] = [
        TrackedField::Anchor,
        TrackedField::LinkMode,
        TrackedField::RenderType,
        TrackedField::DisplayMode,
        TrackedField::Scale,
    ];

    /// Key used in the persisted form.
    pub fn key(self) -> &'static str {
        match self {
            TrackedField::Anchor => "anchor_point",
            TrackedField::LinkMode => "link_mode",
            TrackedField::RenderType => "render_type",
            TrackedField::DisplayMode => "display_mode",
            TrackedField::Scale => "hud_scale",
        }
    }

    pub fn default_value(self) -> FieldValue {
        match self {
            TrackedField::Scale => FieldValue::Scale(DEFAULT_SCALE),
            _ => FieldValue::Ordinal(0),
        }
    }

    /// Bring a raw value into the field's valid range.
    pub fn normalize(self, value: FieldValue) -> FieldValue {
        match (self, value) {
            (TrackedField::Scale, FieldValue::Scale(s)) => FieldValue::Scale(clamp_scale(s)),
            (TrackedField::Scale, FieldValue::Ordinal(o)) => {
                FieldValue::Scale(clamp_scale(o as f32))
            }
            (_, FieldValue::Scale(s)) => self.normalize(FieldValue::Ordinal(s.round() as i64)),
            (TrackedField::Anchor, FieldValue::Ordinal(o)) => {
                FieldValue::Ordinal(clamp_ordinal::<AnchorPoint>(o))
            }
            (TrackedField::LinkMode, FieldValue::Ordinal(o)) => {
                FieldValue::Ordinal(clamp_ordinal::<LinkMode>(o))
            }
            (TrackedField::RenderType, FieldValue::Ordinal(o)) => {
                FieldValue::Ordinal(clamp_ordinal::<RenderType>(o))
            }
            (TrackedField::DisplayMode, FieldValue::Ordinal(o)) => {
                FieldValue::Ordinal(clamp_ordinal::<DisplayMode>(o))
            }
        }
    }
}

/// Raw value of a tracked field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Ordinal(i64),
    Scale(f32),
}

impl FieldValue {
    /// Equality with scale tolerance.
    pub fn same_as(self, other: FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Ordinal(a), FieldValue::Ordinal(b)) => a == b,
            (FieldValue::Scale(a), FieldValue::Scale(b)) => (a - b).abs() <= SCALE_EPSILON,
            _ => false,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Ordinal(o) => write!(f, "{o}"),
            FieldValue::Scale(s) => write!(f, "{s}"),
        }
    }
}

/// Canonical in-process HUD configuration.
///
/// Setters only clamp and derive; persisting is always the caller's job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigRecord {
    anchor: ConfigField<AnchorPoint>,
    link_mode: ConfigField<LinkMode>,
    render_type: ConfigField<RenderType>,
    display_mode: ConfigField<DisplayMode>,
    scale: ScaleField,
    offsets: Offsets,
    pub controls_enabled: bool,
    pub streamer_mode: bool,
}

impl ConfigRecord {
    pub fn anchor(&self) -> AnchorPoint {
        self.anchor.value()
    }

    pub fn link_mode(&self) -> LinkMode {
        self.link_mode.value()
    }

    pub fn render_type(&self) -> RenderType {
        self.render_type.value()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode.value()
    }

    pub fn scale(&self) -> f32 {
        self.scale.get()
    }

    pub fn offsets(&self) -> Offsets {
        self.offsets
    }

    pub fn ordinal(&self, field: TrackedField) -> Option<i64> {
        match field {
            TrackedField::Anchor => Some(self.anchor.ordinal()),
            TrackedField::LinkMode => Some(self.link_mode.ordinal()),
            TrackedField::RenderType => Some(self.render_type.ordinal()),
            TrackedField::DisplayMode => Some(self.display_mode.ordinal()),
            TrackedField::Scale => None,
        }
    }

    /// Set an enumerated field's ordinal, clamped. Changing the anchor resets
    /// the offsets to the new anchor's defaults. Scale is not an ordinal and
    /// is left untouched.
    pub fn set_ordinal(&mut self, field: TrackedField, ordinal: i64) -> bool {
        match field {
            TrackedField::Anchor => {
                let changed = self.anchor.set_ordinal(ordinal);
                if changed {
                    self.offsets = self.anchor.value().default_offsets();
                }
                changed
            }
            TrackedField::LinkMode => self.link_mode.set_ordinal(ordinal),
            TrackedField::RenderType => self.render_type.set_ordinal(ordinal),
            TrackedField::DisplayMode => self.display_mode.set_ordinal(ordinal),
            TrackedField::Scale => false,
        }
    }

    pub fn set_scale(&mut self, scale: f32) -> bool {
        self.scale.set(scale)
    }

    pub fn get(&self, field: TrackedField) -> FieldValue {
        match self.ordinal(field) {
            Some(ordinal) => FieldValue::Ordinal(ordinal),
            None => FieldValue::Scale(self.scale()),
        }
    }

    pub fn set(&mut self, field: TrackedField, value: FieldValue) -> bool {
        match field.normalize(value) {
            FieldValue::Scale(s) => self.set_scale(s),
            FieldValue::Ordinal(o) => self.set_ordinal(field, o),
        }
    }

    /// Place the widget at an exact position: anchor plus offsets, as left
    /// behind by a drag.
    pub fn place(&mut self, anchor: AnchorPoint, offsets: Offsets) {
        self.anchor.set_ordinal(anchor.ordinal());
        self.offsets = offsets;
    }

    pub fn set_offsets(&mut self, offsets: Offsets) {
        self.offsets = offsets;
    }
}
