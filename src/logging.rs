use crate::settings::HudSettings;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialise logging. Without `debug` the level is pinned to `info` so a
/// stray `RUST_LOG` cannot make the HUD chatty; with it, `RUST_LOG` may
/// override the `debug` default.
///
/// When `file` is given, output goes there instead of stderr.
pub fn init(debug: bool, file: Option<PathBuf>) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let writer = file.as_ref().and_then(|path| {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = path.file_name()?;
        Some(tracing_appender::rolling::never(dir, name))
    });
    let _ = match writer {
        Some(writer) => builder.with_writer(writer).with_ansi(false).try_init(),
        None => builder.try_init(),
    };
}

/// `init` driven by the engine settings.
pub fn init_from_settings(settings: &HudSettings) {
    init(settings.debug_logging, settings.log_path());
}
