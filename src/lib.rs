//! fplaunchwrapper - short-named launchers for Flatpak applications
//!
//! Each wrapper decides per invocation whether to run a native system binary
//! or the sandboxed Flatpak app, and remembers the user's choice. This crate
//! provides:
//! - Path containment and wrapper authenticity checks
//! - A cross-process regeneration lock
//! - Hardened discovery of system binaries
//! - Name sanitization and wrapper generation
//! - The per-invocation preference decision

pub mod apps;
pub mod atomic;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod launch;
pub mod paths;
pub mod resolver;
pub mod security;
pub mod wrapper;

pub use config::Config;
pub use error::{FplaunchError, Result};
