//! CLI subcommand: `fplaunch resolve`
//!
//! Runs the same hardened lookup a wrapper does, for debugging. Rejection
//! reasons are visible with `-v`.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::wrapper::LauncherName;

#[derive(Args)]
pub struct ResolveArgs {
    /// Launcher name to look up
    pub name: String,

    /// Path to exclude (defaults to the wrapper in the bin directory)
    #[arg(long)]
    pub exclude: Option<PathBuf>,
}

pub fn run(args: ResolveArgs, config: &Config) -> Result<()> {
    let name = LauncherName::parse(&args.name)?;
    let exclude = args
        .exclude
        .unwrap_or_else(|| config.paths.wrapper_path(&name));
    let resolver = super::system_resolver(config);

    match resolver.resolve(name.as_str(), Some(&exclude)) {
        Some(found) => {
            if found.path == found.resolved {
                println!("{}", found.path.display());
            } else {
                println!("{} -> {}", found.path.display(), found.resolved.display());
            }
            Ok(())
        }
        None => {
            eprintln!("No system binary named '{}'. Searched:", name);
            for dir in resolver.accepted_dirs() {
                eprintln!("  {}", dir.display());
            }
            std::process::exit(1);
        }
    }
}
