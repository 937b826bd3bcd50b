//! Wrapper directory maintenance: generate, list, remove, cleanup.
//!
//! Every mutation runs under the `regenerate` lock, checks that the bin and
//! config directories stay inside home, and only ever touches files whose
//! header proves they are ours. Scripts are replaced atomically, so a wrapper
//! that is running while regeneration happens sees either the old or the new
//! file, never a torn one.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::apps::AppSource;
use crate::atomic::write_atomically;
use crate::concurrency::{DEFAULT_POLL_INTERVAL, LockHandle, LockManager, REGENERATE_LOCK};
use crate::error::{FplaunchError, Result};
use crate::launch::{Choice, PreferenceStore};
use crate::paths::Paths;
use crate::security::{WrapperHeader, ensure_contained, is_valid_app_id, read_header};

use super::records::WrapperRecords;
use super::{LauncherName, render_wrapper};

/// Default wait for the regeneration lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Why an application id did not get a wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InvalidId,
    Blocked,
    /// Another id in the same batch already produced this name.
    NameCollision { other_id: String },
    /// A file that is not a generated wrapper occupies the name.
    ForeignFile,
    /// A generated wrapper for a different application occupies the name.
    OwnedByOtherApp { id: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidId => f.write_str("invalid application id"),
            SkipReason::Blocked => f.write_str("blocklisted"),
            SkipReason::NameCollision { other_id } => {
                write!(f, "name already taken by {}", other_id)
            }
            SkipReason::ForeignFile => f.write_str("existing file was not generated by fplaunchwrapper"),
            SkipReason::OwnedByOtherApp { id } => write!(f, "existing wrapper belongs to {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub id: String,
    pub name: Option<LauncherName>,
    pub reason: SkipReason,
}

/// Outcome of one generation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub created: Vec<LauncherName>,
    pub updated: Vec<LauncherName>,
    pub unchanged: Vec<LauncherName>,
    pub skipped: Vec<Skipped>,
    pub removed: Vec<LauncherName>,
}

/// An authentic wrapper found in the bin directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrapperInfo {
    pub name: String,
    pub id: String,
    pub path: PathBuf,
    pub preference: String,
}

pub struct WrapperManager {
    paths: Paths,
    lock_timeout: Duration,
    poll_interval: Duration,
}

impl WrapperManager {
    pub fn new(paths: &Paths) -> Self {
        Self {
            paths: paths.clone(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_lock_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.lock_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Containment checks plus the regeneration lock.
    fn begin(&self) -> Result<(PathBuf, LockHandle)> {
        let bin_dir = ensure_contained(&self.paths.bin_dir, &self.paths.home)?;
        let config_dir = ensure_contained(&self.paths.config_dir, &self.paths.home)?;
        fs::create_dir_all(&config_dir).map_err(|e| FplaunchError::io(&config_dir, e))?;

        let lock = LockManager::new(&self.paths.lock_dir(), &self.paths.home)?
            .with_poll_interval(self.poll_interval)
            .acquire(REGENERATE_LOCK, self.lock_timeout)?;

        fs::create_dir_all(&bin_dir).map_err(|e| FplaunchError::io(&bin_dir, e))?;
        Ok((bin_dir, lock))
    }

    /// Authentic wrappers in `bin_dir`, sorted by name.
    fn scan(bin_dir: &Path) -> Result<Vec<(LauncherName, PathBuf, WrapperHeader)>> {
        let entries = match fs::read_dir(bin_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FplaunchError::io(bin_dir, e)),
        };

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name
                .to_str()
                .and_then(|s| LauncherName::parse(s).ok())
            else {
                continue;
            };
            let path = entry.path();
            if let Some(header) = read_header(&path) {
                found.push((name, path, header));
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }

    /// Create or refresh wrappers for `ids`.
    ///
    /// `launcher` is the absolute path of the `fplaunch` binary that the
    /// scripts exec. With `prune`, authentic wrappers whose id is not in
    /// `ids` are removed in the same locked batch.
    pub fn generate(
        &self,
        ids: &[String],
        launcher: &Path,
        blocklist: &[String],
        prune: bool,
    ) -> Result<GenerationReport> {
        let (bin_dir, lock) = self.begin()?;
        let records_path = self.paths.records_file();
        let mut records = WrapperRecords::load(&records_path);
        let mut report = GenerationReport::default();

        let mut claimed: BTreeMap<LauncherName, String> = BTreeMap::new();
        let mut wanted: BTreeSet<&str> = BTreeSet::new();

        for id in ids {
            if !wanted.insert(id.as_str()) {
                continue;
            }
            if !is_valid_app_id(id) {
                report.skipped.push(Skipped {
                    id: id.clone(),
                    name: None,
                    reason: SkipReason::InvalidId,
                });
                continue;
            }

            let name = LauncherName::sanitize(id);
            let skip = |reason| Skipped {
                id: id.clone(),
                name: Some(name.clone()),
                reason,
            };

            if blocklist.iter().any(|b| b == id || b == name.as_str()) {
                report.skipped.push(skip(SkipReason::Blocked));
                continue;
            }
            if let Some(other_id) = claimed.get(&name) {
                report.skipped.push(skip(SkipReason::NameCollision {
                    other_id: other_id.clone(),
                }));
                continue;
            }

            let path = bin_dir.join(name.as_str());
            let existing = match fs::symlink_metadata(&path) {
                Ok(_) => match read_header(&path) {
                    Some(header) if header.id != *id => {
                        report.skipped.push(skip(SkipReason::OwnedByOtherApp { id: header.id }));
                        continue;
                    }
                    Some(_) => fs::read_to_string(&path).ok(),
                    None => {
                        report.skipped.push(skip(SkipReason::ForeignFile));
                        continue;
                    }
                },
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => return Err(FplaunchError::io(&path, e)),
            };

            let script = render_wrapper(&name, id, &path, launcher)?;
            claimed.insert(name.clone(), id.clone());

            match existing {
                Some(current) if current == script => {
                    debug!("Wrapper {} unchanged", name);
                    report.unchanged.push(name.clone());
                }
                Some(_) => {
                    write_atomically(&path, script.as_bytes(), Some(0o755))?;
                    report.updated.push(name.clone());
                }
                None => {
                    write_atomically(&path, script.as_bytes(), Some(0o755))?;
                    report.created.push(name.clone());
                }
            }
            if records.get(name.as_str()).is_none_or(|r| r.id != *id) {
                records.insert(name.as_str(), id);
            }
        }

        if prune {
            let keep: BTreeSet<&str> = claimed.values().map(String::as_str).collect();
            report.removed = self.prune(&bin_dir, &mut records, |id| keep.contains(id))?;
        }

        records.save(&records_path)?;
        drop(lock);

        info!(
            "Generated wrappers: {} created, {} updated, {} unchanged, {} skipped, {} removed",
            report.created.len(),
            report.updated.len(),
            report.unchanged.len(),
            report.skipped.len(),
            report.removed.len()
        );
        Ok(report)
    }

    /// [`generate`](Self::generate) for every app `source` reports.
    pub fn generate_from(
        &self,
        source: &dyn AppSource,
        launcher: &Path,
        blocklist: &[String],
        prune: bool,
    ) -> Result<GenerationReport> {
        let ids = source.installed_apps()?;
        self.generate(&ids, launcher, blocklist, prune)
    }

    /// Remove authentic wrappers whose id fails `keep`.
    fn prune(
        &self,
        bin_dir: &Path,
        records: &mut WrapperRecords,
        keep: impl Fn(&str) -> bool,
    ) -> Result<Vec<LauncherName>> {
        let mut removed = Vec::new();
        for (name, path, header) in Self::scan(bin_dir)? {
            if keep(&header.id) {
                continue;
            }
            self.remove_files(&name, &path, records)?;
            removed.push(name);
        }
        Ok(removed)
    }

    fn remove_files(
        &self,
        name: &LauncherName,
        path: &Path,
        records: &mut WrapperRecords,
    ) -> Result<()> {
        fs::remove_file(path).map_err(|e| FplaunchError::io(path, e))?;
        if let Err(e) = PreferenceStore::new(&self.paths).clear(name) {
            warn!("Wrapper {} removed but its preference remains: {}", name, e);
        }
        records.remove(name.as_str());
        info!("Removed wrapper {}", name);
        Ok(())
    }

    /// Authentic wrappers with their stored preference.
    pub fn list(&self) -> Result<Vec<WrapperInfo>> {
        let store = PreferenceStore::new(&self.paths);
        Ok(Self::scan(&self.paths.bin_dir)?
            .into_iter()
            .map(|(name, path, header)| WrapperInfo {
                preference: store.load(&name).label().to_string(),
                name: name.to_string(),
                id: header.id,
                path,
            })
            .collect())
    }

    /// Remove one wrapper, refusing anything that is not authentic.
    pub fn remove(&self, name: &LauncherName) -> Result<()> {
        let (bin_dir, lock) = self.begin()?;
        let path = bin_dir.join(name.as_str());
        if read_header(&path).is_none() {
            return Err(FplaunchError::NotAuthenticWrapper(path));
        }

        let records_path = self.paths.records_file();
        let mut records = WrapperRecords::load(&records_path);
        self.remove_files(name, &path, &mut records)?;
        records.save(&records_path)?;
        drop(lock);
        Ok(())
    }

    /// Remove wrappers for applications no longer in `installed`.
    pub fn cleanup(&self, installed: &[String]) -> Result<Vec<LauncherName>> {
        let (bin_dir, lock) = self.begin()?;
        let records_path = self.paths.records_file();
        let mut records = WrapperRecords::load(&records_path);

        let installed: BTreeSet<&str> = installed.iter().map(String::as_str).collect();
        let removed = self.prune(&bin_dir, &mut records, |id| installed.contains(id))?;

        records.save(&records_path)?;
        drop(lock);
        Ok(removed)
    }

    /// Store or clear the preference of an existing wrapper.
    pub fn set_preference(&self, name: &LauncherName, choice: Option<Choice>) -> Result<()> {
        let path = self.paths.wrapper_path(name);
        if read_header(&path).is_none() {
            return Err(FplaunchError::NotAuthenticWrapper(path));
        }
        let store = PreferenceStore::new(&self.paths);
        match choice {
            Some(choice) => store.save(name, choice),
            None => store.clear(name).map(|_| ()),
        }
    }
}
