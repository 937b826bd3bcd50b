//! Error taxonomy shared by the wrapper engine.
//!
//! Containment, authenticity, and lock failures are hard stops: callers abort
//! before writing anything. A missing system candidate is not an error at all
//! (the resolver returns `None`), and preference drift is repaired silently.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FplaunchError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("{} escapes the home directory {}", .path.display(), .root.display())]
    PathEscapesHome { path: PathBuf, root: PathBuf },

    #[error(
        "Timed out after {}s waiting for lock '{name}'{}; another regeneration is in progress",
        .waited.as_secs_f32(),
        .owner.map(|pid| format!(" (held by PID {})", pid)).unwrap_or_default()
    )]
    LockTimeout {
        name: String,
        waited: Duration,
        owner: Option<u32>,
    },

    #[error("{} is not a wrapper generated by fplaunchwrapper; refusing to touch it", .0.display())]
    NotAuthenticWrapper(PathBuf),

    #[error("Invalid application id: {0:?}")]
    InvalidAppId(String),

    #[error("Invalid launcher name: {0:?}")]
    InvalidName(String),

    #[error("flatpak executable not found in any system directory")]
    FlatpakNotFound,

    #[error("Launch cancelled at the preference prompt")]
    PromptCancelled,

    #[error("Terminal prompt failed: {0}")]
    Prompt(String),

    #[error("Listing installed applications failed: {0}")]
    AppList(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Wrapper records error: {0}")]
    Records(#[from] serde_json::Error),
}

impl FplaunchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FplaunchError>;
