//! Name → application id records kept next to the preferences.
//!
//! The wrapper header is the source of truth for authenticity; records only
//! remember what the generator produced so collisions and cleanup can be
//! reported without rescanning every file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::atomic::write_atomically;
use crate::error::{FplaunchError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperRecord {
    pub id: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperRecords {
    #[serde(default)]
    pub wrappers: BTreeMap<String, WrapperRecord>,
}

impl WrapperRecords {
    /// Load records; a missing or corrupt file starts empty.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Cannot read wrapper records {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring corrupt wrapper records {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FplaunchError::io(parent, e))?;
        }
        write_atomically(path, &json, Some(0o644))
    }

    pub fn get(&self, name: &str) -> Option<&WrapperRecord> {
        self.wrappers.get(name)
    }

    pub fn insert(&mut self, name: &str, id: &str) {
        self.wrappers.insert(
            name.to_string(),
            WrapperRecord {
                id: id.to_string(),
                generated_at: Utc::now(),
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> Option<WrapperRecord> {
        self.wrappers.remove(name)
    }
}
