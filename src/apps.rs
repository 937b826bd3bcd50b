//! Installed Flatpak applications.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{FplaunchError, Result};
use crate::security::is_valid_app_id;

/// Where the list of installed application ids comes from.
#[cfg_attr(test, mockall::automock)]
pub trait AppSource {
    fn installed_apps(&self) -> Result<Vec<String>>;
}

/// Asks the `flatpak` CLI (located by the system resolver).
#[derive(Debug, Clone)]
pub struct FlatpakCli {
    flatpak: PathBuf,
}

impl FlatpakCli {
    pub fn new(flatpak: &Path) -> Self {
        Self {
            flatpak: flatpak.to_path_buf(),
        }
    }
}

impl AppSource for FlatpakCli {
    fn installed_apps(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.flatpak)
            .args(["list", "--app", "--columns=application"])
            .output()
            .map_err(|e| FplaunchError::io(&self.flatpak, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FplaunchError::AppList(format!(
                "{} exited with {}: {}",
                self.flatpak.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(parse_app_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// One id per line. Header rows, blank lines, and anything outside the id
/// charset are dropped; order is kept and duplicates removed.
pub fn parse_app_list(output: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::new();
    for line in output.lines() {
        let id = line.trim();
        if id.is_empty() || id == "Application ID" {
            continue;
        }
        if !is_valid_app_id(id) {
            debug!("Ignoring malformed application id {:?}", id);
            continue;
        }
        if seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flatpak_list_output() {
        let out = "Application ID\norg.mozilla.firefox\n\n  org.gnome.Evince  \nbad id\norg.mozilla.firefox\n";
        assert_eq!(parse_app_list(out), vec!["org.mozilla.firefox", "org.gnome.Evince"]);
    }

    #[cfg(unix)]
    #[test]
    fn runs_flatpak_binary() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let fake = tmp.path().join("flatpak");
        std::fs::write(&fake, "#!/bin/sh\necho org.videolan.VLC\necho org.gimp.GIMP\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let ids = FlatpakCli::new(&fake).installed_apps().unwrap();
        assert_eq!(ids, vec!["org.videolan.VLC", "org.gimp.GIMP"]);
    }

    #[cfg(unix)]
    #[test]
    fn failing_flatpak_is_an_error() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let fake = tmp.path().join("flatpak");
        std::fs::write(&fake, "#!/bin/sh\necho broken >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = FlatpakCli::new(&fake).installed_apps().unwrap_err();
        assert!(matches!(err, FplaunchError::AppList(_)));
    }
}
