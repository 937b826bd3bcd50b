//! Path canonicalization and home-directory containment.
//!
//! Every write into the config directory or the bin directory goes through
//! [`ensure_contained`] first. The check defeats two redirection tricks:
//! `..` segments that climb out of the home directory, and a directory that
//! is itself a symlink pointing somewhere else.

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{FplaunchError, Result};

/// Expand `~`, anchor against `cwd`, and collapse `.`/`..` lexically.
///
/// The path does not need to exist. `..` at the filesystem root stays at the
/// root.
pub fn canonicalize(path: &str, cwd: &Path, home: &Path) -> Result<PathBuf> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(FplaunchError::InvalidPath("empty path".to_string()));
    }
    if trimmed.contains('\0') {
        return Err(FplaunchError::InvalidPath(format!(
            "path contains a NUL byte: {:?}",
            trimmed
        )));
    }

    let expanded = shellexpand::tilde_with_context(trimmed, || home.to_str());
    let expanded = Path::new(expanded.as_ref());

    let absolute = if expanded.is_absolute() {
        expanded.to_path_buf()
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexically(&absolute))
}

/// Collapse `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping the root is a no-op, which is what we want.
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve the longest existing ancestor on disk and re-attach the rest.
///
/// This catches symlinked *ancestors* (e.g. `~/bin` → `/usr/local/bin`) even
/// when the final component has not been created yet.
fn resolve_existing_prefix(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(real) => {
                let mut resolved = real;
                for part in tail.iter().rev() {
                    resolved.push(part);
                }
                return Ok(normalize_lexically(&resolved));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let Some(name) = existing.file_name().map(|n| n.to_os_string()) else {
                    return Err(err);
                };
                tail.push(name);
                if !existing.pop() {
                    return Err(err);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// Follow `path` one symlink level, then canonicalize.
fn resolve_for_containment(path: &Path) -> Option<PathBuf> {
    let path = normalize_lexically(path);
    if !path.is_absolute() {
        return None;
    }

    let target = match std::fs::symlink_metadata(&path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let link = std::fs::read_link(&path).ok()?;
            let joined = if link.is_absolute() {
                link
            } else {
                path.parent()?.join(link)
            };
            normalize_lexically(&joined)
        }
        Ok(_) => path,
        Err(err) if err.kind() == io::ErrorKind::NotFound => path,
        Err(_) => return None,
    };

    resolve_existing_prefix(&target).ok()
}

/// True when `path` resolves to `root` or to something beneath it.
///
/// Resolution failures (dangling or unreadable symlink, unreadable ancestor)
/// count as escapes.
pub fn validate_contained(path: &Path, root: &Path) -> bool {
    let Some(resolved) = resolve_for_containment(path) else {
        debug!("Containment: could not resolve {}", path.display());
        return false;
    };
    let Some(root) = resolve_for_containment(root) else {
        debug!("Containment: could not resolve root {}", root.display());
        return false;
    };

    // Path::starts_with compares whole components: /home/u2 is not under /home/u.
    let contained = resolved == root || resolved.starts_with(&root);
    if !contained {
        debug!(
            "Containment: {} resolves to {} outside {}",
            path.display(),
            resolved.display(),
            root.display()
        );
    }
    contained
}

/// [`validate_contained`] as a hard error, for use right before a write.
pub fn ensure_contained(path: &Path, root: &Path) -> Result<PathBuf> {
    if validate_contained(path, root) {
        Ok(normalize_lexically(path))
    } else {
        Err(FplaunchError::PathEscapesHome {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })
    }
}
