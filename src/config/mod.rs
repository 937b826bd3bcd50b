use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::atomic::write_atomically;
use crate::paths::Paths;
use crate::security::canonicalize;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolved XDG-compliant paths (not serialized)
    #[serde(skip)]
    pub paths: Paths,

    /// File this config was loaded from (not serialized)
    #[serde(skip)]
    pub file: PathBuf,

    #[serde(default)]
    pub wrappers: WrappersConfig,

    #[serde(default)]
    pub resolver: ResolverSettings,

    #[serde(default)]
    pub lock: LockConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WrappersConfig {
    /// Install directory for wrappers; must stay inside home.
    /// Overridden by FPLAUNCH_BIN_DIR.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_dir: Option<String>,

    /// Application ids or launcher names that never get a wrapper.
    #[serde(default)]
    pub blocklist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Search sanitized PATH entries after the fixed system directories.
    #[serde(default = "default_true")]
    pub consult_path: bool,

    /// Only accept system binaries owned by `system_owner_uid`.
    #[serde(default)]
    pub require_system_owner: bool,

    #[serde(default)]
    pub system_owner_uid: u32,

    /// Extra absolute prefixes (outside home) that may supply binaries.
    #[serde(default)]
    pub extra_allowed_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_lock_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_true() -> bool {
    true
}
fn default_lock_timeout_secs() -> u64 {
    30
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            consult_path: default_true(),
            require_system_owner: false,
            system_owner_uid: 0,
            extra_allowed_prefixes: Vec::new(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_lock_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load using the real environment. `config_file` overrides the default
    /// location (the `-c` flag).
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(config_file, |key| std::env::var(key))
    }

    /// Load with a custom env var lookup (for testing).
    ///
    /// A missing file yields defaults; nothing is created on disk.
    pub fn load_with_env<F>(config_file: Option<&Path>, env_fn: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        let mut paths = Paths::resolve_with_env(&env_fn)?;
        let path = config_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| paths.config_file());

        let mut config: Config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Config::default()
        };

        let bin_from_env = env_fn("FPLAUNCH_BIN_DIR").is_ok_and(|v| !v.is_empty());
        if !bin_from_env && let Some(dir) = &config.wrappers.bin_dir {
            paths.bin_dir = canonicalize(dir, &paths.home, &paths.home)
                .with_context(|| format!("Invalid wrappers.bin_dir {:?}", dir))?;
        }

        config.paths = paths;
        config.file = path;
        Ok(config)
    }

    /// Like [`Config::load`], but an unreadable or invalid file falls back to
    /// defaults. The error is handed back so the caller can log it once
    /// logging is up. Failing to locate home is still fatal.
    pub fn load_or_default(config_file: Option<&Path>) -> Result<(Self, Option<anyhow::Error>)> {
        Self::load_or_default_with_env(config_file, |key| std::env::var(key))
    }

    pub fn load_or_default_with_env<F>(
        config_file: Option<&Path>,
        env_fn: F,
    ) -> Result<(Self, Option<anyhow::Error>)>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        match Self::load_with_env(config_file, &env_fn) {
            Ok(config) => Ok((config, None)),
            Err(err) => {
                let paths = Paths::resolve_with_env(&env_fn)?;
                let file = config_file
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| paths.config_file());
                let config = Config {
                    paths,
                    file,
                    ..Config::default()
                };
                Ok((config, Some(err)))
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        write_atomically(&self.file, content.as_bytes(), Some(0o644))?;
        Ok(())
    }

    /// Write the commented template to `path` (for first-time setup).
    pub fn write_template(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomically(path, DEFAULT_CONFIG_TEMPLATE.as_bytes(), Some(0o644))?;
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock.poll_interval_ms.max(1))
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["wrappers", "bin_dir"] => Ok(self
                .wrappers
                .bin_dir
                .clone()
                .unwrap_or_else(|| self.paths.bin_dir.display().to_string())),
            ["wrappers", "blocklist"] => Ok(self.wrappers.blocklist.join(",")),
            ["resolver", "consult_path"] => Ok(self.resolver.consult_path.to_string()),
            ["resolver", "require_system_owner"] => {
                Ok(self.resolver.require_system_owner.to_string())
            }
            ["resolver", "system_owner_uid"] => Ok(self.resolver.system_owner_uid.to_string()),
            ["resolver", "extra_allowed_prefixes"] => {
                Ok(self.resolver.extra_allowed_prefixes.join(","))
            }
            ["lock", "timeout_secs"] => Ok(self.lock.timeout_secs.to_string()),
            ["lock", "poll_interval_ms"] => Ok(self.lock.poll_interval_ms.to_string()),
            ["logging", "level"] => Ok(self.logging.level.clone()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["wrappers", "bin_dir"] => {
                self.wrappers.bin_dir = (!value.is_empty()).then(|| value.to_string())
            }
            ["wrappers", "blocklist"] => self.wrappers.blocklist = split_list(value),
            ["resolver", "consult_path"] => self.resolver.consult_path = value.parse()?,
            ["resolver", "require_system_owner"] => {
                self.resolver.require_system_owner = value.parse()?
            }
            ["resolver", "system_owner_uid"] => self.resolver.system_owner_uid = value.parse()?,
            ["resolver", "extra_allowed_prefixes"] => {
                self.resolver.extra_allowed_prefixes = split_list(value)
            }
            ["lock", "timeout_secs"] => self.lock.timeout_secs = value.parse()?,
            ["lock", "poll_interval_ms"] => self.lock.poll_interval_ms = value.parse()?,
            ["logging", "level"] => self.logging.level = value.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Default config template with helpful comments (used by `config init`)
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# fplaunchwrapper configuration
# Every key is optional; the values below are the defaults.

[wrappers]
# Where wrappers are installed. Must be inside your home directory.
# Overridden by FPLAUNCH_BIN_DIR.
# bin_dir = "~/bin"

# Application ids or launcher names that never get a wrapper.
blocklist = []

[resolver]
# After /usr/local/bin, /usr/bin, /bin, /usr/local/sbin, /usr/sbin, /sbin,
# also search your PATH (only allow-listed system directories are used).
consult_path = true

# Only run system binaries owned by this uid.
require_system_owner = false
system_owner_uid = 0

# Extra system prefixes that may supply binaries (absolute, outside home).
extra_allowed_prefixes = []

[lock]
# How long generate/remove/cleanup wait for a concurrent run to finish.
timeout_secs = 30
poll_interval_ms = 100

[logging]
# Wrappers themselves only log errors unless RUST_LOG is set.
level = "info"
"#;
