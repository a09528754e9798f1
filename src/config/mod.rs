pub mod mirror;
pub mod modes;
pub mod record;
pub mod store;

pub use mirror::PersistedRecord;
pub use modes::{DisplayMode, LinkMode, Ordinal, RenderType, ScreenKind};
pub use record::{ConfigField, ConfigRecord, FieldValue, ScaleField, TrackedField};
pub use store::{ConfigStorage, FileStorage, MemoryStorage, MirrorSnapshot, PersistWorker};
