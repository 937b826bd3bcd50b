//! Persisted per-wrapper preference.
//!
//! The on-disk record is one word, `system` or `flatpak`, with nothing after
//! it. Anything else reads back as [`Preference::NoPreference`] so a
//! corrupted file simply means "ask again".

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::atomic::write_atomically;
use crate::error::{FplaunchError, Result};
use crate::paths::Paths;
use crate::security::ensure_contained;
use crate::wrapper::LauncherName;

/// A concrete choice between the two launch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    System,
    Flatpak,
}

impl Choice {
    pub fn as_str(self) -> &'static str {
        match self {
            Choice::System => "system",
            Choice::Flatpak => "flatpak",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "system" => Ok(Choice::System),
            "flatpak" => Ok(Choice::Flatpak),
            other => Err(format!(
                "unknown preference {:?} (expected \"system\" or \"flatpak\")",
                other
            )),
        }
    }
}

/// Stored preference state of one wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preference {
    #[default]
    NoPreference,
    PreferSystem,
    PreferFlatpak,
}

impl From<Choice> for Preference {
    fn from(choice: Choice) -> Self {
        match choice {
            Choice::System => Preference::PreferSystem,
            Choice::Flatpak => Preference::PreferFlatpak,
        }
    }
}

impl Preference {
    /// Parse record content. A single trailing newline (from hand edits) is
    /// tolerated; any other deviation is corruption.
    pub fn parse_record(content: &str) -> Self {
        let word = content.strip_suffix('\n').unwrap_or(content);
        match word.parse::<Choice>() {
            Ok(choice) => choice.into(),
            Err(_) => Preference::NoPreference,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Preference::NoPreference => "unset",
            Preference::PreferSystem => "system",
            Preference::PreferFlatpak => "flatpak",
        }
    }
}

/// Preference records under the config directory.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    paths: Paths,
}

impl PreferenceStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            paths: paths.clone(),
        }
    }

    fn record_path(&self, name: &LauncherName) -> PathBuf {
        self.paths.pref_file(name)
    }

    /// Read the stored preference. Missing or unreadable means unset.
    pub fn load(&self, name: &LauncherName) -> Preference {
        let path = self.record_path(name);
        match fs::read_to_string(&path) {
            Ok(content) => {
                let pref = Preference::parse_record(&content);
                if pref == Preference::NoPreference {
                    debug!("Ignoring corrupt preference record {}", path.display());
                }
                pref
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Preference::NoPreference,
            Err(e) => {
                debug!("Cannot read preference {}: {}", path.display(), e);
                Preference::NoPreference
            }
        }
    }

    /// Atomically replace the stored preference.
    pub fn save(&self, name: &LauncherName, choice: Choice) -> Result<()> {
        let config_dir = ensure_contained(&self.paths.config_dir, &self.paths.home)?;
        fs::create_dir_all(&config_dir).map_err(|e| FplaunchError::io(&config_dir, e))?;
        write_atomically(
            &self.record_path(name),
            choice.as_str().as_bytes(),
            Some(0o644),
        )
    }

    /// Remove the stored preference. Returns whether one existed.
    pub fn clear(&self, name: &LauncherName) -> Result<bool> {
        ensure_contained(&self.paths.config_dir, &self.paths.home)?;
        let path = self.record_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                warn!("Failed to remove preference {}: {}", path.display(), e);
                Err(FplaunchError::io(path, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(home: &std::path::Path) -> PreferenceStore {
        PreferenceStore::new(&Paths::under_home(home))
    }

    #[test]
    fn record_parsing_is_strict() {
        assert_eq!(Preference::parse_record("system"), Preference::PreferSystem);
        assert_eq!(Preference::parse_record("flatpak"), Preference::PreferFlatpak);
        assert_eq!(Preference::parse_record("system\n"), Preference::PreferSystem);

        for corrupt in ["", "System", " system", "system extra", "flatpak\n\n", "yes"] {
            assert_eq!(
                Preference::parse_record(corrupt),
                Preference::NoPreference,
                "accepted {:?}",
                corrupt
            );
        }
    }

    #[test]
    fn save_load_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let name = LauncherName::parse("firefox").unwrap();

        assert_eq!(store.load(&name), Preference::NoPreference);

        store.save(&name, Choice::System).unwrap();
        assert_eq!(store.load(&name), Preference::PreferSystem);
        let on_disk = fs::read_to_string(Paths::under_home(tmp.path()).pref_file(&name)).unwrap();
        assert_eq!(on_disk, "system");

        store.save(&name, Choice::Flatpak).unwrap();
        assert_eq!(store.load(&name), Preference::PreferFlatpak);

        assert!(store.clear(&name).unwrap());
        assert!(!store.clear(&name).unwrap());
        assert_eq!(store.load(&name), Preference::NoPreference);
    }

    #[cfg(unix)]
    #[test]
    fn save_refuses_config_dir_outside_home() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        let outside = tmp.path().join("outside");
        fs::create_dir_all(home.join(".config")).unwrap();
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, home.join(".config/fplaunchwrapper")).unwrap();

        let store = store(&home);
        let name = LauncherName::parse("firefox").unwrap();
        let err = store.save(&name, Choice::System).unwrap_err();
        assert!(matches!(err, FplaunchError::PathEscapesHome { .. }));
        assert_eq!(fs::read_dir(&outside).unwrap().count(), 0);
    }
}
