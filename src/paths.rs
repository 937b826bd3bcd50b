//! XDG-compliant path resolution for the wrapper engine.
//!
//! Every directory is resolved through a three-level fallback:
//! 1. fplaunchwrapper-specific env var (FPLAUNCH_CONFIG_DIR, FPLAUNCH_BIN_DIR)
//! 2. XDG env var (XDG_CONFIG_HOME) via `etcetera`
//! 3. Platform default (~/.config/fplaunchwrapper, ~/bin)
//!
//! Relative paths from env vars are ignored per XDG spec. Nothing here checks
//! containment; callers run [`crate::security::ensure_contained`] before any
//! write.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::wrapper::LauncherName;

/// Directory name used under the XDG config home.
pub const APP_DIR_NAME: &str = "fplaunchwrapper";

/// Resolved directory paths for the whole tool.
///
/// Created once at startup and threaded through every operation, so no module
/// below the CLI layer reads `HOME` or `XDG_*` itself.
#[derive(Debug, Clone)]
pub struct Paths {
    /// The user's home directory; the containment root.
    pub home: PathBuf,

    /// Config directory: config.toml, preference files, locks, records.
    pub config_dir: PathBuf,

    /// Directory wrappers are installed into.
    pub bin_dir: PathBuf,
}

impl Paths {
    /// Resolve all paths using real environment variables.
    pub fn resolve() -> Result<Self> {
        Self::resolve_with_env(|key| std::env::var(key))
    }

    /// Resolve paths with a custom env var lookup (for testing).
    pub fn resolve_with_env<F>(env_fn: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        use etcetera::BaseStrategy;

        let strategy = etcetera::choose_base_strategy()
            .map_err(|e| anyhow::anyhow!("Failed to determine base directories: {}", e))?;

        let home = match env_path(&env_fn, "HOME") {
            Some(home) => home,
            None => etcetera::home_dir()
                .map_err(|e| anyhow::anyhow!("Failed to determine home directory: {}", e))?,
        };

        let config_dir = env_or(&env_fn, "FPLAUNCH_CONFIG_DIR", || {
            strategy.config_dir().join(APP_DIR_NAME)
        });

        let bin_dir = env_or(&env_fn, "FPLAUNCH_BIN_DIR", || home.join("bin"));

        Ok(Self {
            home,
            config_dir,
            bin_dir,
        })
    }

    /// Paths rooted at an explicit home, with the default layout beneath it.
    pub fn under_home(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
            config_dir: home.join(".config").join(APP_DIR_NAME),
            bin_dir: home.join("bin"),
        }
    }

    // ── Convenience accessors for specific files ──

    /// Config file: config_dir/config.toml
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Preference record for one wrapper: config_dir/{name}.pref
    pub fn pref_file(&self, name: &LauncherName) -> PathBuf {
        self.config_dir.join(format!("{}.pref", name))
    }

    /// Lock directory: config_dir/locks
    pub fn lock_dir(&self) -> PathBuf {
        self.config_dir.join("locks")
    }

    /// Name → application id records: config_dir/wrappers.json
    pub fn records_file(&self) -> PathBuf {
        self.config_dir.join("wrappers.json")
    }

    /// Install path of the wrapper for `name`.
    pub fn wrapper_path(&self, name: &LauncherName) -> PathBuf {
        self.bin_dir.join(name.as_str())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::resolve().unwrap_or_else(|_| {
            // Emergency fallback, should never happen in practice
            let home = etcetera::home_dir().unwrap_or_else(|_| PathBuf::from("."));
            Self::under_home(&home)
        })
    }
}

/// Resolve an env var with fallback. Ignores empty and relative paths per XDG spec.
fn env_or<F>(env_fn: &F, var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    env_path(env_fn, var).unwrap_or_else(default)
}

fn env_path<F>(env_fn: &F, var: &str) -> Option<PathBuf>
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    env_fn(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .filter(|p| p.is_absolute()) // XDG spec: ignore relative paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Helper: build an env_fn from a HashMap
    fn make_env(
        map: HashMap<&str, &str>,
    ) -> impl Fn(&str) -> std::result::Result<String, std::env::VarError> {
        move |key: &str| {
            map.get(key)
                .map(|v| v.to_string())
                .ok_or(std::env::VarError::NotPresent)
        }
    }

    #[test]
    fn default_paths_are_xdg_compliant() {
        let mut env: HashMap<&str, &str> = HashMap::new();
        env.insert("HOME", "/home/u");
        let paths = Paths::resolve_with_env(make_env(env)).unwrap();

        assert!(
            paths.config_dir.ends_with(APP_DIR_NAME),
            "config_dir: {:?}",
            paths.config_dir
        );
        assert_eq!(paths.home, PathBuf::from("/home/u"));
        assert_eq!(paths.bin_dir, PathBuf::from("/home/u/bin"));
    }

    #[test]
    fn env_vars_override_defaults() {
        let mut env: HashMap<&str, &str> = HashMap::new();
        env.insert("HOME", "/home/u");
        env.insert("FPLAUNCH_CONFIG_DIR", "/home/u/custom/config");
        env.insert("FPLAUNCH_BIN_DIR", "/home/u/.local/bin");

        let paths = Paths::resolve_with_env(make_env(env)).unwrap();
        assert_eq!(paths.config_dir, PathBuf::from("/home/u/custom/config"));
        assert_eq!(paths.bin_dir, PathBuf::from("/home/u/.local/bin"));
    }

    #[test]
    fn relative_paths_are_ignored() {
        let mut env: HashMap<&str, &str> = HashMap::new();
        env.insert("HOME", "/home/u");
        env.insert("FPLAUNCH_BIN_DIR", "relative/bin");

        let paths = Paths::resolve_with_env(make_env(env)).unwrap();
        assert_eq!(paths.bin_dir, PathBuf::from("/home/u/bin"));
    }

    #[test]
    fn empty_env_vars_ignored() {
        let mut env: HashMap<&str, &str> = HashMap::new();
        env.insert("HOME", "/home/u");
        env.insert("FPLAUNCH_CONFIG_DIR", "");

        let paths = Paths::resolve_with_env(make_env(env)).unwrap();
        assert!(paths.config_dir.is_absolute());
        assert!(paths.config_dir.ends_with(APP_DIR_NAME));
    }

    #[test]
    fn convenience_accessors() {
        let paths = Paths::under_home(Path::new("/home/u"));
        let name = LauncherName::parse("firefox").unwrap();

        assert!(paths.config_file().ends_with("config.toml"));
        assert!(paths.pref_file(&name).ends_with("fplaunchwrapper/firefox.pref"));
        assert!(paths.lock_dir().ends_with("fplaunchwrapper/locks"));
        assert!(paths.records_file().ends_with("wrappers.json"));
        assert_eq!(paths.wrapper_path(&name), PathBuf::from("/home/u/bin/firefox"));
    }
}
