use crate::config::record::{ConfigRecord, FieldValue, TrackedField};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

/// `key = value` with the key bare, single- or double-quoted and the value
/// optionally quoted. A trailing `# comment` is allowed.
static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*(?:"(?P<dq>[^"]+)"|'(?P<sq>[^']+)'|(?P<bare>[A-Za-z0-9_.\-]+))\s*=\s*(?:"(?P<dv>[^"]*)"|'(?P<sv>[^']*)'|(?P<bv>[^#]*?))\s*(?:#.*)?$"#,
    )
    .expect("persisted line pattern")
});

/// Point-in-time view of the persisted HUD file. `None` means the file had
/// no usable opinion on that key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedRecord {
    pub anchor_point: Option<i64>,
    pub link_mode: Option<i64>,
    pub render_type: Option<i64>,
    pub display_mode: Option<i64>,
    pub hud_scale: Option<f32>,
    pub x_offset: Option<f32>,
    pub y_offset: Option<f32>,
    pub controls: Option<bool>,
    pub streamer_mode: Option<bool>,
}

impl PersistedRecord {
    pub fn get(&self, field: TrackedField) -> Option<FieldValue> {
        match field {
            TrackedField::Anchor => self.anchor_point.map(FieldValue::Ordinal),
            TrackedField::LinkMode => self.link_mode.map(FieldValue::Ordinal),
            TrackedField::RenderType => self.render_type.map(FieldValue::Ordinal),
            TrackedField::DisplayMode => self.display_mode.map(FieldValue::Ordinal),
            TrackedField::Scale => self.hud_scale.map(FieldValue::Scale),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == PersistedRecord::default()
    }

    pub fn from_record(record: &ConfigRecord) -> Self {
        let offsets = record.offsets();
        Self {
            anchor_point: record.ordinal(TrackedField::Anchor),
            link_mode: record.ordinal(TrackedField::LinkMode),
            render_type: record.ordinal(TrackedField::RenderType),
            display_mode: record.ordinal(TrackedField::DisplayMode),
            hud_scale: Some(record.scale()),
            x_offset: Some(offsets.x),
            y_offset: Some(offsets.y),
            controls: Some(record.controls_enabled),
            streamer_mode: Some(record.streamer_mode),
        }
    }
}

/// Parse the persisted form. Unknown keys and malformed lines are skipped and
/// a bad value only clears its own key. The first usable occurrence of a key
/// wins.
pub fn parse(raw: &str) -> PersistedRecord {
    let mut out = PersistedRecord::default();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            continue;
        }
        let Some(caps) = LINE_RE.captures(line) else {
            tracing::debug!(line = trimmed, "skipping malformed persisted line");
            continue;
        };
        let key = caps
            .name("dq")
            .or_else(|| caps.name("sq"))
            .or_else(|| caps.name("bare"))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let value = caps
            .name("dv")
            .or_else(|| caps.name("sv"))
            .or_else(|| caps.name("bv"))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        match key {
            "anchor_point" => set_once(&mut out.anchor_point, parse_ordinal(value)),
            "link_mode" => set_once(&mut out.link_mode, parse_ordinal(value)),
            "render_type" => set_once(&mut out.render_type, parse_ordinal(value)),
            "display_mode" => set_once(&mut out.display_mode, parse_ordinal(value)),
            "hud_scale" => set_once(&mut out.hud_scale, parse_decimal(value)),
            "x_offset" => set_once(&mut out.x_offset, parse_decimal(value)),
            "y_offset" => set_once(&mut out.y_offset, parse_decimal(value)),
            "controls" => set_once(&mut out.controls, parse_flag(value)),
            "streamer_mode" => set_once(&mut out.streamer_mode, parse_flag(value)),
            _ => {}
        }
    }
    out
}

fn set_once<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn parse_ordinal(value: &str) -> Option<i64> {
    match value.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            // Some writers store every number as a decimal.
            let v = value.parse::<f64>().ok()?;
            (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
        }
    }
}

fn parse_decimal(value: &str) -> Option<f32> {
    value.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Render the record in the persisted form.
pub fn render(record: &ConfigRecord) -> String {
    let persisted = PersistedRecord::from_record(record);
    let mut out = String::new();
    let _ = writeln!(out, "# HUD placement and display settings");
    for field in TrackedField::ALL {
        if let Some(value) = persisted.get(field) {
            let _ = writeln!(out, "{} = {}", field.key(), value);
        }
    }
    let offsets = record.offsets();
    let _ = writeln!(out, "x_offset = {}", offsets.x);
    let _ = writeln!(out, "y_offset = {}", offsets.y);
    let _ = writeln!(out, "controls = {}", record.controls_enabled);
    let _ = writeln!(out, "streamer_mode = {}", record.streamer_mode);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_bare_keys() {
        let rec = parse("anchor_point = 3\nhud_scale = 1.5\n");
        assert_eq!(rec.anchor_point, Some(3));
        assert_eq!(rec.hud_scale, Some(1.5));
        assert_eq!(rec.link_mode, None);
    }

    #[test]
    fn ignores_sections_and_comments() {
        let raw = "[rendering]\n# anchor_point = 6\n    anchor_point = 2 # drag\n";
        assert_eq!(parse(raw).anchor_point, Some(2));
    }

    #[test]
    fn first_occurrence_wins() {
        let rec = parse("link_mode = 1\nlink_mode = 0\n");
        assert_eq!(rec.link_mode, Some(1));
    }

    #[test]
    fn bad_first_value_leaves_room_for_later_one() {
        let rec = parse("display_mode = soon\ndisplay_mode = 2\n");
        assert_eq!(rec.display_mode, Some(2));
    }

    #[test]
    fn integral_decimal_is_an_ordinal() {
        assert_eq!(parse("render_type = 2.0").render_type, Some(2));
        assert_eq!(parse("render_type = 2.5").render_type, None);
    }
}
