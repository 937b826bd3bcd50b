use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show {
        /// Output format: toml (default) or json
        #[arg(short, long, default_value = "toml")]
        format: String,
    },

    /// Get a configuration value
    Get {
        /// Config key (e.g., resolver.consult_path)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Config key (e.g., wrappers.blocklist)
        key: String,

        /// Value to set (lists are comma separated)
        value: String,
    },

    /// Show config file path
    Path,

    /// Initialize default config file
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs, config: Config) -> Result<()> {
    match args.command {
        ConfigCommands::Show { format } => show_config(&config, &format),
        ConfigCommands::Get { key } => {
            println!("{}", config.get_value(&key)?);
            Ok(())
        }
        ConfigCommands::Set { key, value } => set_config(config, &key, &value),
        ConfigCommands::Path => {
            println!("{}", config.file.display());
            Ok(())
        }
        ConfigCommands::Init { force } => {
            Config::write_template(&config.file, force)?;
            println!("Created config file at {}", config.file.display());
            Ok(())
        }
    }
}

fn show_config(config: &Config, format: &str) -> Result<()> {
    match format {
        "json" => {
            let json = serde_json::to_string_pretty(config)?;
            println!("{}", json);
        }
        _ => {
            let toml = toml::to_string_pretty(config)?;
            println!("{}", toml);
        }
    }

    Ok(())
}

fn set_config(mut config: Config, key: &str, value: &str) -> Result<()> {
    config.set_value(key, value)?;
    config.save()?;
    println!("Set {} = {}", key, value);
    Ok(())
}
