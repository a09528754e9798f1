use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_config_path() -> String {
    "./config/hud.toml".into()
}

fn default_sweep_interval() -> u32 {
    20
}

fn default_flush_interval() -> u32 {
    1
}

fn default_seek_throttle_ms() -> u64 {
    200
}

fn default_offset_epsilon() -> f32 {
    0.01
}

/// Engine tuning, stored as JSON next to the host's own settings. The HUD
/// record itself lives in the file named by `config_path`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HudSettings {
    /// Persisted HUD record.
    #[serde(default = "default_config_path")]
    pub config_path: String,
    /// Initialise the logger at debug level. Defaults to `false` when the
    /// field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Write logs to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Ticks between full sweeps against the persisted record.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ticks: u32,
    /// Ticks between flushes of a dirty record.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ticks: u32,
    /// Minimum spacing of seeks while scrubbing the progress bar.
    #[serde(default = "default_seek_throttle_ms")]
    pub seek_throttle_ms: u64,
    /// A drop closer than this to the stored offsets is not persisted.
    #[serde(default = "default_offset_epsilon")]
    pub offset_epsilon: f32,
    /// Hide the artwork, which makes the HUD narrower.
    #[serde(default)]
    pub compact: bool,
}

impl Default for HudSettings {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            debug_logging: false,
            log_file: None,
            sweep_interval_ticks: default_sweep_interval(),
            flush_interval_ticks: default_flush_interval(),
            seek_throttle_ms: default_seek_throttle_ms(),
            offset_epsilon: default_offset_epsilon(),
            compact: false,
        }
    }
}

impl HudSettings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn seek_throttle(&self) -> Duration {
        Duration::from_millis(self.seek_throttle_ms)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file.as_ref().map(PathBuf::from)
    }
}
