//! Wrapper script template.
//!
//! The script is deliberately thin: it carries the header contract that
//! [`crate::security::is_wrapper`] checks and hands everything else to
//! `fplaunch launch`, which runs the resolver and the preference engine.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{FplaunchError, Result};
use crate::security::{FLATPAK_ID_COMMENT, WRAPPER_MARKER, is_valid_app_id};

use super::LauncherName;

static SAFE_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/[A-Za-z0-9/._-]*$").expect("safe path pattern is valid"));

/// Paths embedded in a script must survive double-quoted shell expansion
/// unchanged.
fn safe_path(path: &Path) -> Result<&str> {
    path.to_str()
        .filter(|s| SAFE_PATH_RE.is_match(s))
        .ok_or_else(|| {
            FplaunchError::InvalidPath(format!(
                "{} cannot be embedded in a wrapper script",
                path.display()
            ))
        })
}

/// Render the wrapper for `name` → `app_id`.
///
/// `wrapper_path` is where the script will be installed (the resolver
/// excludes it); `launcher` is the absolute path of the `fplaunch` binary.
pub fn render_wrapper(
    name: &LauncherName,
    app_id: &str,
    wrapper_path: &Path,
    launcher: &Path,
) -> Result<String> {
    if !is_valid_app_id(app_id) {
        return Err(FplaunchError::InvalidAppId(app_id.to_string()));
    }
    let wrapper = safe_path(wrapper_path)?;
    let launcher = safe_path(launcher)?;

    Ok(format!(
        "#!/bin/sh\n\
{marker}\n\
{id_comment} {id}\n\
# Regenerated by `fplaunch generate`; local edits are overwritten.\n\
NAME=\"{name}\"\n\
ID=\"{id}\"\n\
WRAPPER=\"{wrapper}\"\n\
FPLAUNCH=\"{launcher}\"\n\
\n\
exec \"$FPLAUNCH\" launch --name \"$NAME\" --id \"$ID\" --wrapper \"$WRAPPER\" -- \"$@\"\n",
        marker = WRAPPER_MARKER,
        id_comment = FLATPAK_ID_COMMENT,
        name = name,
        id = app_id,
        wrapper = wrapper,
        launcher = launcher,
    ))
}
