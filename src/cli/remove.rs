use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::wrapper::LauncherName;

#[derive(Args)]
pub struct RemoveArgs {
    /// Launcher name of the wrapper (e.g. firefox)
    pub name: String,
}

pub fn run(args: RemoveArgs, config: &Config) -> Result<()> {
    let name = LauncherName::parse(&args.name)?;
    super::wrapper_manager(config).remove(&name)?;
    println!("Removed {}", name);
    Ok(())
}
