//! Which directories may ever supply a system binary.
//!
//! A directory has to be well formed, outside the home directory, *and* on
//! this list, both as written and after symlink resolution. Anything else is
//! rejected even if it looks harmless. Some rules only cover the resolved
//! form: a Nix profile directory is a symlink into `/nix/store`, but the
//! store itself is never a search directory.

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

/// Fixed precedence list searched for every name.
pub const DEFAULT_SEARCH_DIRS: &[&str] = &[
    "/usr/local/bin",
    "/usr/bin",
    "/bin",
    "/usr/local/sbin",
    "/usr/sbin",
    "/sbin",
];

/// Standard system directories accepted as-is.
const SYSTEM_DIRS: &[&str] = &[
    "/usr/local/bin",
    "/usr/bin",
    "/bin",
    "/usr/local/sbin",
    "/usr/sbin",
    "/sbin",
    "/usr/games",
    "/usr/local/games",
];

/// Known third-party system prefixes; anything beneath them is accepted.
const SYSTEM_PREFIXES: &[&str] = &[
    "/opt",
    "/snap/bin",
    "/var/lib/snapd/snap/bin",
    "/nix/var/nix/profiles",
    "/run/current-system/sw/bin",
    "/home/linuxbrew/.linuxbrew/bin",
];

/// Where allow-listed symlinked directories may land after resolution.
const RESOLUTION_TARGETS: &[&str] = &["/nix/store"];

/// Longest directory path considered at all.
pub const MAX_DIR_LEN: usize = 1024;

static DIR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/[A-Za-z0-9/._-]*$").expect("directory pattern is valid"));

/// One allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowRule {
    /// Exactly this directory.
    Exact(PathBuf),
    /// This directory or anything beneath it.
    Prefix(PathBuf),
    /// Anything beneath this directory, but only as the resolved form of a
    /// directory some other rule accepted.
    Target(PathBuf),
}

impl AllowRule {
    /// Does this rule accept `dir` as written in the search list?
    pub fn matches(&self, dir: &Path) -> bool {
        match self {
            AllowRule::Exact(allowed) => dir == allowed,
            AllowRule::Prefix(prefix) => dir.starts_with(prefix),
            AllowRule::Target(_) => false,
        }
    }

    /// Does this rule accept `dir` as the canonical form of a listed directory?
    pub fn matches_resolved(&self, dir: &Path) -> bool {
        match self {
            AllowRule::Target(prefix) => dir.starts_with(prefix),
            rule => rule.matches(dir),
        }
    }
}

/// The built-in allow-list.
pub fn default_allow_rules() -> Vec<AllowRule> {
    SYSTEM_DIRS
        .iter()
        .map(|d| AllowRule::Exact(PathBuf::from(d)))
        .chain(
            SYSTEM_PREFIXES
                .iter()
                .map(|p| AllowRule::Prefix(PathBuf::from(p))),
        )
        .chain(
            RESOLUTION_TARGETS
                .iter()
                .map(|t| AllowRule::Target(PathBuf::from(t))),
        )
        .collect()
}

/// Strict shape check applied before touching the filesystem.
pub fn is_well_formed(dir: &str) -> bool {
    DIR_PATTERN.is_match(dir)
}

/// True if any component is `..`.
pub fn has_parent_segment(dir: &Path) -> bool {
    dir.components().any(|c| matches!(c, Component::ParentDir))
}

/// Reduce a raw `PATH` value to candidate directories.
///
/// Characters outside `[A-Za-z0-9/:._-]` are stripped before splitting, so
/// shell syntax such as `;`, `|`, `$(`, or spaces can never survive into a
/// path. Empty entries (which mean "current directory" to a shell) are
/// dropped, and duplicates keep their first position.
pub fn sanitize_path_var(raw: &str) -> Vec<PathBuf> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))
        .collect();

    let mut dirs: Vec<PathBuf> = Vec::new();
    for entry in cleaned.split(':') {
        if entry.is_empty() {
            continue;
        }
        let dir = PathBuf::from(entry);
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_prefix_rules() {
        let rules = default_allow_rules();
        let allowed = |d: &str| rules.iter().any(|r| r.matches(Path::new(d)));

        assert!(allowed("/usr/bin"));
        assert!(allowed("/bin"));
        assert!(allowed("/opt/google/chrome"));
        assert!(allowed("/nix/var/nix/profiles/default/bin"));

        assert!(!allowed("/usr/bin/subdir"));
        assert!(!allowed("/usr"));
        assert!(!allowed("/tmp"));
        assert!(!allowed("/optional"));
        assert!(!allowed("/home/u/bin"));
    }

    #[test]
    fn store_paths_only_accepted_as_resolution_targets() {
        let rules = default_allow_rules();
        let listed = |d: &str| rules.iter().any(|r| r.matches(Path::new(d)));
        let resolved = |d: &str| rules.iter().any(|r| r.matches_resolved(Path::new(d)));

        assert!(!listed("/nix/store/abc-system-path/bin"));
        assert!(resolved("/nix/store/abc-system-path/bin"));
        assert!(resolved("/run/current-system/sw/bin"));
        assert!(resolved("/usr/bin"));
        assert!(!resolved("/nix/storefront/bin"));
        assert!(!resolved("/tmp"));
    }

    #[test]
    fn well_formed_directories() {
        assert!(is_well_formed("/usr/bin"));
        assert!(is_well_formed("/opt/app-1.2_x/bin"));

        assert!(!is_well_formed("usr/bin"));
        assert!(!is_well_formed("/usr/bin;rm"));
        assert!(!is_well_formed("/usr/b in"));
        assert!(!is_well_formed("/usr/$(id)"));
        assert!(!is_well_formed(""));
    }

    #[test]
    fn parent_segments_detected() {
        assert!(has_parent_segment(Path::new("/usr/../home/u/bin")));
        assert!(has_parent_segment(Path::new("../bin")));
        assert!(!has_parent_segment(Path::new("/usr/bin")));
        assert!(!has_parent_segment(Path::new("/opt/app..x/bin")));
    }

    #[test]
    fn path_var_is_sanitized_and_deduplicated() {
        let dirs = sanitize_path_var("/usr/bin:/usr/bin;rm -rf /:$(id)::/opt/x/bin|cat:/usr/bin");
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/usr/bin"),
                PathBuf::from("/usr/binrm-rf/"),
                PathBuf::from("id"),
                PathBuf::from("/opt/x/bincat"),
            ]
        );
        assert!(sanitize_path_var("").is_empty());
        assert!(sanitize_path_var(":::").is_empty());
    }
}
