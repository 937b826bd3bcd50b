//! CLI subcommand: `fplaunch launch` (hidden)
//!
//! Invoked by every generated wrapper. Prints nothing except the first-run
//! prompt; on success the process is replaced and this never returns.

use anyhow::Result;
use clap::Args;
use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::FplaunchError;
use crate::launch::{ForceMode, LaunchEnv, LaunchRequest, PreferenceStore, TerminalPrompter};
use crate::wrapper::LauncherName;

/// Exit status after Ctrl-C at the prompt, as a shell would report it.
const EXIT_CANCELLED: i32 = 130;

#[derive(Args)]
pub struct LaunchArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub id: String,

    /// Install path of the calling wrapper
    #[arg(long)]
    pub wrapper: Option<PathBuf>,

    /// Arguments passed through to the launched program
    #[arg(last = true)]
    pub args: Vec<OsString>,
}

pub fn run(args: LaunchArgs, config: &Config) -> Result<()> {
    let request = LaunchRequest {
        name: LauncherName::parse(&args.name)?,
        app_id: args.id,
        wrapper: args.wrapper,
        args: args.args,
    };
    let env = LaunchEnv {
        interactive: std::io::stdin().is_terminal() && std::io::stdout().is_terminal(),
        force: ForceMode::from_env_value(std::env::var("FPWRAPPER_FORCE").ok().as_deref()),
    };

    let store = PreferenceStore::new(&config.paths);
    let resolver = super::system_resolver(config);
    let mut prompter = TerminalPrompter;

    match crate::launch::run(&request, &store, &resolver, env, &mut prompter) {
        Ok(()) => Ok(()),
        Err(FplaunchError::PromptCancelled) => std::process::exit(EXIT_CANCELLED),
        Err(e) => Err(e.into()),
    }
}
