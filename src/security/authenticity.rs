//! Content-based authenticity check for generated wrappers.
//!
//! The bin directory is shared with whatever else the user keeps there, so
//! nothing may be removed, rewritten, or listed unless its header proves the
//! generator wrote it. The header is read without executing anything and at
//! bounded cost.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Exact marker line every generated wrapper carries.
pub const WRAPPER_MARKER: &str = "# Generated by fplaunchwrapper";

/// Human-readable id comment, used as a fallback by [`get_id`].
pub const FLATPAK_ID_COMMENT: &str = "# Flatpak ID:";

/// Header fields must appear within this many lines.
pub const HEADER_MAX_LINES: usize = 30;

/// Upper bound on bytes read while scanning the header.
pub const HEADER_MAX_BYTES: u64 = 8 * 1024;

const ACCEPTED_SHEBANGS: &[&str] = &[
    "#!/bin/sh",
    "#!/bin/bash",
    "#!/usr/bin/bash",
    "#!/usr/bin/env sh",
    "#!/usr/bin/env bash",
];

static APP_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+$").expect("application id pattern is valid")
});

/// True if `id` only uses the strict application identifier charset.
pub fn is_valid_app_id(id: &str) -> bool {
    APP_ID_RE.is_match(id)
}

/// Parsed header of an authentic wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperHeader {
    pub name: String,
    pub id: String,
}

/// Read the first [`HEADER_MAX_LINES`] lines, refusing symlinks, non-regular
/// files, and anything containing a non-printable byte.
fn read_header_lines(path: &Path) -> Option<Vec<String>> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            debug!("Not a wrapper, cannot stat {}: {}", path.display(), e);
            return None;
        }
    };
    if meta.file_type().is_symlink() {
        debug!("Not a wrapper, symlink: {}", path.display());
        return None;
    }
    if !meta.is_file() {
        debug!("Not a wrapper, not a regular file: {}", path.display());
        return None;
    }

    let file = File::open(path).ok()?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .take(HEADER_MAX_BYTES)
        .read_to_end(&mut bytes)
        .ok()?;

    let mut lines = Vec::new();
    for line in bytes.split(|b| *b == b'\n').take(HEADER_MAX_LINES) {
        if line.iter().any(|&b| !is_printable(b)) {
            debug!("Not a wrapper, binary content: {}", path.display());
            return None;
        }
        // Printable ASCII only, so this cannot fail.
        lines.push(String::from_utf8_lossy(line).into_owned());
    }
    Some(lines)
}

fn is_printable(b: u8) -> bool {
    matches!(b, b'\t' | b'\r' | 0x20..=0x7e)
}

/// Value of a `KEY=...` assignment, with one layer of quotes removed.
fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.trim().strip_prefix(key)?.strip_prefix('=')?;
    let rest = rest.trim();
    let unquoted = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))
        .unwrap_or(rest);
    Some(unquoted)
}

fn parse_header(lines: &[String]) -> Option<WrapperHeader> {
    let shebang = lines.first()?.trim_end();
    if !ACCEPTED_SHEBANGS.contains(&shebang) {
        return None;
    }

    if !lines.iter().any(|l| l.trim_end() == WRAPPER_MARKER) {
        return None;
    }

    let name = lines.iter().find_map(|l| field_value(l, "NAME"))?;
    if name.is_empty() {
        return None;
    }

    let id = lines.iter().find_map(|l| field_value(l, "ID"))?;
    if !is_valid_app_id(id) {
        return None;
    }

    Some(WrapperHeader {
        name: name.to_string(),
        id: id.to_string(),
    })
}

/// Parse the header of `path` if, and only if, it is an authentic wrapper.
pub fn read_header(path: &Path) -> Option<WrapperHeader> {
    let lines = read_header_lines(path)?;
    let header = parse_header(&lines);
    if header.is_none() {
        debug!("Not a wrapper, header contract not met: {}", path.display());
    }
    header
}

/// True if `path` is a wrapper written by the generator.
///
/// Callers must never delete, overwrite, or list a file that fails this.
pub fn is_wrapper(path: &Path) -> bool {
    read_header(path).is_some()
}

/// Extract the application id of a wrapper-like file.
///
/// Prefers the `ID=` field and falls back to the `# Flatpak ID:` comment.
/// Either value is filtered down to the identifier charset.
pub fn get_id(path: &Path) -> Option<String> {
    let lines = read_header_lines(path)?;

    let from_field = lines.iter().find_map(|l| field_value(l, "ID"));
    let from_comment = || {
        lines
            .iter()
            .find_map(|l| l.trim().strip_prefix(FLATPAK_ID_COMMENT))
    };

    let raw = from_field.or_else(from_comment)?;
    let filtered: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    if filtered.is_empty() {
        None
    } else {
        Some(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "#!/bin/sh\n\
# Generated by fplaunchwrapper\n\
# Flatpak ID: org.mozilla.firefox\n\
NAME=\"firefox\"\n\
ID=\"org.mozilla.firefox\"\n\
exec true\n";

    fn write(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn genuine_wrapper_is_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "firefox", GOOD.as_bytes());

        assert!(is_wrapper(&path));
        assert_eq!(
            read_header(&path),
            Some(WrapperHeader {
                name: "firefox".to_string(),
                id: "org.mozilla.firefox".to_string(),
            })
        );
    }

    #[test]
    fn bash_shebang_and_unquoted_fields_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let content = "#!/usr/bin/env bash\n# Generated by fplaunchwrapper\nNAME=gimp\nID=org.gimp.GIMP\n";
        let path = write(tmp.path(), "gimp", content.as_bytes());
        assert!(is_wrapper(&path));
    }

    #[test]
    fn empty_file_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "empty", b"");
        assert!(!is_wrapper(&path));
    }

    #[test]
    fn binary_file_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut content = GOOD.as_bytes().to_vec();
        content.insert(12, 0x00);
        let path = write(tmp.path(), "bin", &content);
        assert!(!is_wrapper(&path));

        let path = write(tmp.path(), "elf", b"\x7fELF\x02\x01\x01\0\0\0");
        assert!(!is_wrapper(&path));
    }

    #[test]
    fn missing_marker_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let content = GOOD.replace(WRAPPER_MARKER, "# Generated by something else");
        let path = write(tmp.path(), "firefox", content.as_bytes());
        assert!(!is_wrapper(&path));
    }

    #[test]
    fn missing_shebang_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let content = GOOD.replace("#!/bin/sh", "#!/usr/bin/python3");
        let path = write(tmp.path(), "firefox", content.as_bytes());
        assert!(!is_wrapper(&path));
    }

    #[test]
    fn shell_metacharacters_in_id_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        for bad in [
            "org.evil;rm -rf ~",
            "org.evil$(id)",
            "org.evil`id`",
            "org.evil|cat",
            "",
        ] {
            let content = GOOD.replace("ID=\"org.mozilla.firefox\"", &format!("ID=\"{}\"", bad));
            let path = write(tmp.path(), "evil", content.as_bytes());
            assert!(!is_wrapper(&path), "accepted id {:?}", bad);
        }
    }

    #[test]
    fn fields_beyond_header_window_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let padding = "# padding\n".repeat(HEADER_MAX_LINES);
        let content = format!(
            "#!/bin/sh\n# Generated by fplaunchwrapper\n{}NAME=\"x\"\nID=\"org.x.X\"\n",
            padding
        );
        let path = write(tmp.path(), "late", content.as_bytes());
        assert!(!is_wrapper(&path));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_genuine_wrapper_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let real = write(tmp.path(), "firefox", GOOD.as_bytes());
        let link = tmp.path().join("ff");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert!(is_wrapper(&real));
        assert!(!is_wrapper(&link));
        assert_eq!(get_id(&link), None);
    }

    #[test]
    fn directory_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!is_wrapper(tmp.path()));
        assert!(!is_wrapper(&tmp.path().join("missing")));
    }

    #[test]
    fn get_id_prefers_field_then_comment() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "firefox", GOOD.as_bytes());
        assert_eq!(get_id(&path).as_deref(), Some("org.mozilla.firefox"));

        let legacy = "#!/bin/sh\n# Flatpak ID: org.gnome.Evince \nexec flatpak run org.gnome.Evince\n";
        let path = write(tmp.path(), "evince", legacy.as_bytes());
        assert_eq!(get_id(&path).as_deref(), Some("org.gnome.Evince"));

        let noisy = "#!/bin/sh\nID=\"org.x;Y\"\n";
        let path = write(tmp.path(), "noisy", noisy.as_bytes());
        assert_eq!(get_id(&path).as_deref(), Some("org.xY"));

        let none = "#!/bin/sh\necho hi\n";
        let path = write(tmp.path(), "none", none.as_bytes());
        assert_eq!(get_id(&path), None);
    }
}
