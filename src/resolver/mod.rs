//! Hardened discovery of a native program with the same name as a wrapper.
//!
//! A plain `PATH` lookup is unsafe here: `~/bin` usually precedes `/usr/bin`,
//! so the lookup finds the wrapper itself and the system package is hidden
//! forever. Instead the resolver walks a fixed precedence list of system
//! directories (optionally followed by a sanitized `PATH`) and only accepts a
//! candidate that survives every check below.
//!
//! Per directory:
//! 1. no `..` segment, not inside home, strictly well formed, bounded length
//! 2. exists and is readable
//! 3. on the allow-list, both as written and after symlink resolution
//!
//! Per candidate `dir/name`:
//! 4. not the excluded wrapper path, and not a symlink resolving to it or into
//!    home; an executable regular file; optionally owned by a system uid; not
//!    itself a generated wrapper
//!
//! Every skip is logged at `debug` with its [`RejectReason`] and is never
//! surfaced to the person running the wrapper. Ambient state (home, `PATH`)
//! arrives through [`ResolverConfig`], never from the process environment.

mod allowlist;

pub use allowlist::{
    AllowRule, DEFAULT_SEARCH_DIRS, MAX_DIR_LEN, default_allow_rules, sanitize_path_var,
};

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ResolverSettings;
use crate::security::{is_wrapper, normalize_lexically};
use crate::wrapper::LauncherName;

/// Who must own an accepted candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipPolicy {
    Any,
    Uid(u32),
}

/// Everything the resolver needs, passed explicitly.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Candidates and directories inside here are always rejected.
    pub home: PathBuf,
    /// Directories searched, in order.
    pub search_dirs: Vec<PathBuf>,
    pub allow_rules: Vec<AllowRule>,
    pub ownership: OwnershipPolicy,
    pub max_dir_len: usize,
}

impl ResolverConfig {
    /// The fixed system precedence list and the built-in allow-list.
    pub fn system_defaults(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
            search_dirs: DEFAULT_SEARCH_DIRS.iter().map(PathBuf::from).collect(),
            allow_rules: default_allow_rules(),
            ownership: OwnershipPolicy::Any,
            max_dir_len: MAX_DIR_LEN,
        }
    }

    /// Build from the `[resolver]` config section.
    ///
    /// `path_env` is the caller's `PATH`, consulted only when the settings
    /// ask for it.
    pub fn from_settings(settings: &ResolverSettings, home: &Path, path_env: Option<&str>) -> Self {
        let extra: Vec<PathBuf> = settings
            .extra_allowed_prefixes
            .iter()
            .map(PathBuf::from)
            .collect();

        let mut config = Self::system_defaults(home).with_extra_prefixes(&extra);
        if settings.require_system_owner {
            config.ownership = OwnershipPolicy::Uid(settings.system_owner_uid);
        }
        if settings.consult_path
            && let Some(path) = path_env
        {
            config = config.with_path_env(path);
        }
        config
    }

    /// Append sanitized `PATH` entries after the fixed list.
    pub fn with_path_env(mut self, raw: &str) -> Self {
        for dir in sanitize_path_var(raw) {
            if !self.search_dirs.contains(&dir) {
                self.search_dirs.push(dir);
            }
        }
        self
    }

    /// Accept more third-party prefixes. Relative prefixes and prefixes
    /// overlapping the home directory are ignored.
    pub fn with_extra_prefixes(mut self, prefixes: &[PathBuf]) -> Self {
        for prefix in prefixes {
            let prefix = normalize_lexically(prefix);
            if !prefix.is_absolute()
                || prefix.starts_with(&self.home)
                || self.home.starts_with(&prefix)
            {
                debug!("Ignoring unsafe allow-list prefix {}", prefix.display());
                continue;
            }
            self.allow_rules.push(AllowRule::Prefix(prefix));
        }
        self
    }

    pub fn with_ownership(mut self, ownership: OwnershipPolicy) -> Self {
        self.ownership = ownership;
        self
    }
}

/// Why a directory or candidate was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    ParentTraversal,
    InsideHome,
    Malformed,
    TooLong,
    Missing,
    Unreadable,
    NotAllowListed,
    IsExcluded,
    SymlinkToExcluded,
    Unresolvable,
    NotRegularFile,
    NotExecutable,
    WrongOwner { uid: u32 },
    GeneratedWrapper,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ParentTraversal => f.write_str("contains a '..' segment"),
            RejectReason::InsideHome => f.write_str("inside the home directory"),
            RejectReason::Malformed => f.write_str("not a well-formed absolute path"),
            RejectReason::TooLong => f.write_str("path too long"),
            RejectReason::Missing => f.write_str("does not exist"),
            RejectReason::Unreadable => f.write_str("not readable"),
            RejectReason::NotAllowListed => f.write_str("not an allow-listed system location"),
            RejectReason::IsExcluded => f.write_str("is the wrapper itself"),
            RejectReason::SymlinkToExcluded => f.write_str("symlink back to the wrapper"),
            RejectReason::Unresolvable => f.write_str("cannot be resolved"),
            RejectReason::NotRegularFile => f.write_str("not a regular file"),
            RejectReason::NotExecutable => f.write_str("not executable"),
            RejectReason::WrongOwner { uid } => write!(f, "owned by uid {}", uid),
            RejectReason::GeneratedWrapper => f.write_str("is itself a generated wrapper"),
        }
    }
}

/// A native program that survived every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCandidate {
    /// Entry as found in the (resolved) search directory.
    pub path: PathBuf,
    /// Fully resolved target of `path`.
    pub resolved: PathBuf,
}

/// Stateless, read-only resolver; safe to use while regeneration runs.
#[derive(Debug, Clone)]
pub struct SystemBinaryResolver {
    config: ResolverConfig,
    home_real: Option<PathBuf>,
}

impl SystemBinaryResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let home_real = fs::canonicalize(&config.home).ok();
        Self { config, home_real }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn in_home(&self, path: &Path) -> bool {
        path.starts_with(&self.config.home)
            || self
                .home_real
                .as_ref()
                .is_some_and(|home| path.starts_with(home))
    }

    fn allow_listed(&self, dir: &Path) -> bool {
        self.config.allow_rules.iter().any(|rule| rule.matches(dir))
    }

    fn allow_listed_target(&self, real: &Path) -> bool {
        self.config
            .allow_rules
            .iter()
            .any(|rule| rule.matches_resolved(real))
    }

    /// Validate one search directory, returning its resolved form.
    pub fn check_dir(&self, dir: &Path) -> Result<PathBuf, RejectReason> {
        let Some(text) = dir.to_str() else {
            return Err(RejectReason::Malformed);
        };
        if text.len() > self.config.max_dir_len {
            return Err(RejectReason::TooLong);
        }
        if allowlist::has_parent_segment(dir) {
            return Err(RejectReason::ParentTraversal);
        }
        if !allowlist::is_well_formed(text) {
            return Err(RejectReason::Malformed);
        }
        if self.in_home(dir) {
            return Err(RejectReason::InsideHome);
        }

        match fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(RejectReason::Missing),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(RejectReason::Missing),
            Err(_) => return Err(RejectReason::Unreadable),
        }
        if fs::read_dir(dir).is_err() {
            return Err(RejectReason::Unreadable);
        }

        let real = fs::canonicalize(dir).map_err(|_| RejectReason::Unresolvable)?;
        if self.in_home(&real) {
            return Err(RejectReason::InsideHome);
        }
        if !self.allow_listed(dir) || !self.allow_listed_target(&real) {
            return Err(RejectReason::NotAllowListed);
        }
        Ok(real)
    }

    /// Accepted search directories in precedence order, duplicates removed.
    pub fn accepted_dirs(&self) -> Vec<PathBuf> {
        let mut accepted: Vec<PathBuf> = Vec::new();
        for dir in &self.config.search_dirs {
            match self.check_dir(dir) {
                Ok(real) => {
                    if !accepted.contains(&real) {
                        accepted.push(real);
                    }
                }
                Err(reason) => {
                    debug!("Skipping search dir {}: {}", dir.display(), reason);
                }
            }
        }
        accepted
    }

    /// Validate one candidate file against the excluded wrapper paths.
    fn check_candidate(
        &self,
        candidate: &Path,
        excluded: &[PathBuf],
    ) -> Result<Option<SystemCandidate>, RejectReason> {
        let link_meta = match fs::symlink_metadata(candidate) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(_) => return Err(RejectReason::Unreadable),
        };

        if excluded.iter().any(|e| e == candidate) {
            return Err(RejectReason::IsExcluded);
        }

        let resolved = fs::canonicalize(candidate).map_err(|_| RejectReason::Unresolvable)?;
        if excluded.iter().any(|e| *e == resolved) {
            return Err(if link_meta.file_type().is_symlink() {
                RejectReason::SymlinkToExcluded
            } else {
                RejectReason::IsExcluded
            });
        }
        if self.in_home(&resolved) {
            return Err(RejectReason::InsideHome);
        }

        let meta = fs::metadata(&resolved).map_err(|_| RejectReason::Unresolvable)?;
        if !meta.is_file() {
            return Err(RejectReason::NotRegularFile);
        }
        if !is_executable(&meta) {
            return Err(RejectReason::NotExecutable);
        }
        if let OwnershipPolicy::Uid(expected) = self.config.ownership
            && let Some(uid) = owner_uid(&meta)
            && uid != expected
        {
            return Err(RejectReason::WrongOwner { uid });
        }
        if is_wrapper(&resolved) {
            return Err(RejectReason::GeneratedWrapper);
        }

        Ok(Some(SystemCandidate {
            path: candidate.to_path_buf(),
            resolved,
        }))
    }

    /// Find the first acceptable system binary called `name`.
    ///
    /// `exclude` is the wrapper's own install path. `None` means nothing was
    /// found, which is a normal outcome.
    pub fn resolve(&self, name: &str, exclude: Option<&Path>) -> Option<SystemCandidate> {
        if LauncherName::parse(name).is_err() {
            debug!("Refusing to resolve invalid name {:?}", name);
            return None;
        }

        let mut excluded: Vec<PathBuf> = Vec::new();
        if let Some(path) = exclude {
            excluded.push(normalize_lexically(path));
            if let Ok(real) = fs::canonicalize(path) {
                excluded.push(real);
            }
        }

        for dir in self.accepted_dirs() {
            let candidate = dir.join(name);
            match self.check_candidate(&candidate, &excluded) {
                Ok(Some(found)) => {
                    debug!(
                        "Resolved {} to {} ({})",
                        name,
                        found.path.display(),
                        found.resolved.display()
                    );
                    return Some(found);
                }
                Ok(None) => {}
                Err(reason) => {
                    debug!(
                        "System candidate rejected: {}: {}",
                        candidate.display(),
                        reason
                    );
                }
            }
        }
        None
    }
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    true
}

#[cfg(unix)]
fn owner_uid(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.uid())
}

#[cfg(not(unix))]
fn owner_uid(_meta: &fs::Metadata) -> Option<u32> {
    None
}
