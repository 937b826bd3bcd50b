//! Generated wrapper scripts and the directory that holds them.

mod manager;
mod name;
mod records;
mod script;

pub use manager::{
    DEFAULT_LOCK_TIMEOUT, GenerationReport, SkipReason, Skipped, WrapperInfo, WrapperManager,
};
pub use name::{LauncherName, MAX_NAME_LEN};
pub use records::{WrapperRecord, WrapperRecords};
pub use script::render_wrapper;
