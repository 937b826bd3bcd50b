//! Write-to-temporary-then-rename for single logical state changes.
//!
//! Preference records, wrapper scripts, the records file, and lock owner
//! files are all replaced this way, so a concurrent reader sees either the
//! old content or the new content and never a prefix of it.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{FplaunchError, Result};

/// Atomically replace `path` with `contents`.
///
/// The temporary file is created in the destination directory so the final
/// rename never crosses a filesystem. `mode` sets Unix permission bits before
/// the rename; it is ignored elsewhere.
pub fn write_atomically(path: &Path, contents: &[u8], mode: Option<u32>) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        FplaunchError::InvalidPath(format!("{} has no parent directory", path.display()))
    })?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| FplaunchError::io(parent, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| FplaunchError::io(tmp.path(), e))?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))
            .map_err(|e| FplaunchError::io(tmp.path(), e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(path)
        .map_err(|e| FplaunchError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn replaces_existing_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("firefox.pref");

        write_atomically(&path, b"system", None).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "system");

        write_atomically(&path, b"flatpak", None).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "flatpak");

        // No temporary files left behind.
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("wrapper");
        write_atomically(&path, b"#!/bin/sh\n", Some(0o755)).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn missing_parent_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing").join("file");
        assert!(write_atomically(&path, b"x", None).is_err());
    }
}
