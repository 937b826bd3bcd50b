//! Pure decision table: stored preference × candidate presence × interactivity.
//!
//! Nothing in here touches the filesystem. The caller loads the preference,
//! runs the resolver, and applies the returned [`Decision`] (persisting the
//! choice and replacing the process).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{FplaunchError, Result};
use crate::wrapper::LauncherName;

use super::preference::{Choice, Preference};

/// Override from `FPWRAPPER_FORCE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Run the system candidate if there is one; never persist.
    System,
    /// Run the sandboxed app; never persist.
    Flatpak,
    /// Ask even when a preference is stored.
    Interactive,
}

impl FromStr for ForceMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(ForceMode::System),
            "flatpak" => Ok(ForceMode::Flatpak),
            "interactive" => Ok(ForceMode::Interactive),
            other => Err(format!("unknown force mode {:?}", other)),
        }
    }
}

impl ForceMode {
    /// Parse an env value; empty or unknown values mean "no override".
    pub fn from_env_value(value: Option<&str>) -> Option<Self> {
        let value = value?;
        if value.trim().is_empty() {
            return None;
        }
        match value.parse() {
            Ok(mode) => Some(mode),
            Err(e) => {
                debug!("Ignoring FPWRAPPER_FORCE: {}", e);
                None
            }
        }
    }
}

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    System(PathBuf),
    Flatpak,
}

/// Outcome of one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub target: LaunchTarget,
    /// Preference to store before launching, if any.
    pub persist: Option<Choice>,
}

/// Answer from the person at the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptReply {
    Chose(Choice),
    /// Input closed before an answer; behave as if non-interactive.
    Closed,
    /// Interrupted; abort the launch.
    Cancelled,
}

/// Asks which program to run when no preference is stored.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter {
    fn ask(&mut self, name: &LauncherName, candidate: &Path, app_id: &str) -> Result<PromptReply>;
}

pub struct DecisionEngine<'a> {
    prompter: &'a mut dyn Prompter,
    interactive: bool,
    force: Option<ForceMode>,
}

impl<'a> DecisionEngine<'a> {
    pub fn new(prompter: &'a mut dyn Prompter, interactive: bool, force: Option<ForceMode>) -> Self {
        Self {
            prompter,
            interactive,
            force,
        }
    }

    pub fn decide(
        &mut self,
        name: &LauncherName,
        app_id: &str,
        pref: Preference,
        candidate: Option<&Path>,
    ) -> Result<Decision> {
        match self.force {
            Some(ForceMode::System) => {
                let target = match candidate {
                    Some(path) => LaunchTarget::System(path.to_path_buf()),
                    None => LaunchTarget::Flatpak,
                };
                return Ok(Decision {
                    target,
                    persist: None,
                });
            }
            Some(ForceMode::Flatpak) => {
                return Ok(Decision {
                    target: LaunchTarget::Flatpak,
                    persist: None,
                });
            }
            Some(ForceMode::Interactive) if self.interactive => {
                if let Some(path) = candidate {
                    return self.ask(name, path, app_id);
                }
            }
            Some(ForceMode::Interactive) | None => {}
        }

        let decision = match (pref, candidate) {
            (Preference::PreferFlatpak, _) => Decision {
                target: LaunchTarget::Flatpak,
                persist: None,
            },
            (Preference::PreferSystem, Some(path)) => Decision {
                target: LaunchTarget::System(path.to_path_buf()),
                persist: None,
            },
            (Preference::PreferSystem, None) => {
                debug!("System {} disappeared, switching preference to flatpak", name);
                Decision {
                    target: LaunchTarget::Flatpak,
                    persist: Some(Choice::Flatpak),
                }
            }
            (Preference::NoPreference, None) => Decision {
                target: LaunchTarget::Flatpak,
                persist: Some(Choice::Flatpak),
            },
            (Preference::NoPreference, Some(path)) if self.interactive => {
                return self.ask(name, path, app_id);
            }
            (Preference::NoPreference, Some(_)) => Decision {
                target: LaunchTarget::Flatpak,
                persist: None,
            },
        };
        Ok(decision)
    }

    fn ask(&mut self, name: &LauncherName, candidate: &Path, app_id: &str) -> Result<Decision> {
        match self.prompter.ask(name, candidate, app_id)? {
            PromptReply::Chose(Choice::System) => Ok(Decision {
                target: LaunchTarget::System(candidate.to_path_buf()),
                persist: Some(Choice::System),
            }),
            PromptReply::Chose(Choice::Flatpak) => Ok(Decision {
                target: LaunchTarget::Flatpak,
                persist: Some(Choice::Flatpak),
            }),
            PromptReply::Closed => Ok(Decision {
                target: LaunchTarget::Flatpak,
                persist: None,
            }),
            PromptReply::Cancelled => Err(FplaunchError::PromptCancelled),
        }
    }
}
