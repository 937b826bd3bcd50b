//! Replace the current process with the chosen program.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{FplaunchError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl LaunchCommand {
    pub fn system(binary: &Path, args: &[OsString]) -> Self {
        Self {
            program: binary.to_path_buf(),
            args: args.to_vec(),
        }
    }

    /// `flatpak run <app_id> <args…>`
    pub fn flatpak(flatpak: &Path, app_id: &str, args: &[OsString]) -> Self {
        let mut full = vec![OsString::from("run"), OsString::from(app_id)];
        full.extend_from_slice(args);
        Self {
            program: flatpak.to_path_buf(),
            args: full,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// Replace this process. Returns only on failure.
#[cfg(unix)]
pub fn exec_into(launch: &LaunchCommand) -> Result<()> {
    use std::os::unix::process::CommandExt;

    let err = launch.command().exec();
    Err(FplaunchError::io(&launch.program, err))
}

/// No `exec` here: run the child and exit with its status.
#[cfg(not(unix))]
pub fn exec_into(launch: &LaunchCommand) -> Result<()> {
    let status = launch
        .command()
        .status()
        .map_err(|e| FplaunchError::io(&launch.program, e))?;
    std::process::exit(status.code().unwrap_or(1));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatpak_command_line() {
        let args = vec![OsString::from("--new-window"), OsString::from("a b")];
        let cmd = LaunchCommand::flatpak(Path::new("/usr/bin/flatpak"), "org.mozilla.firefox", &args);
        assert_eq!(cmd.program, PathBuf::from("/usr/bin/flatpak"));
        assert_eq!(
            cmd.args,
            vec!["run", "org.mozilla.firefox", "--new-window", "a b"]
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
    }

    #[cfg(unix)]
    #[test]
    fn exec_failure_is_reported() {
        let cmd = LaunchCommand::system(Path::new("/nonexistent/fplaunch-test-bin"), &[]);
        let err = exec_into(&cmd).unwrap_err();
        assert!(matches!(err, FplaunchError::Io { .. }));
    }
}
