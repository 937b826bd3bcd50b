//! CLI subcommand: `fplaunch paths`
//!
//! Prints all resolved paths for debugging and scripting.

use anyhow::Result;

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let paths = &config.paths;

    println!("fplaunchwrapper Paths");
    println!("=====================");
    println!();
    println!("Home:       {}", paths.home.display());
    println!("Bin:        {}", paths.bin_dir.display());
    println!();
    println!("Config:     {}", paths.config_dir.display());
    println!("  config.toml:    {}", config.file.display());
    println!("  wrappers.json:  {}", paths.records_file().display());
    println!("  preferences:    {}", paths.config_dir.join("<name>.pref").display());
    println!("  locks:          {}", paths.lock_dir().display());

    Ok(())
}
