use anyhow::Result;
use clap::Args;

use crate::config::Config;

#[derive(Args)]
pub struct ListArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ListArgs, config: &Config) -> Result<()> {
    let wrappers = super::wrapper_manager(config).list()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&wrappers)?);
        return Ok(());
    }

    if wrappers.is_empty() {
        println!("No wrappers in {}", config.paths.bin_dir.display());
        return Ok(());
    }
    let width = wrappers.iter().map(|w| w.name.len()).max().unwrap_or(0);
    for w in &wrappers {
        println!("{:width$}  {:8}  {}", w.name, w.preference, w.id, width = width);
    }
    Ok(())
}
