pub mod anchor;
pub mod backing;
pub mod config;
pub mod drag;
pub mod hud;
pub mod logging;
pub mod playback;
pub mod reconcile;
pub mod settings;
pub mod widget;

pub use anchor::{AnchorPoint, Offsets};
pub use hud::HudEngine;
