use anyhow::Result;
use clap::Parser;
use std::path::Path;

use fplaunchwrapper::cli::{self, Cli, Commands};
use fplaunchwrapper::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_file = cli.config.as_deref().map(Path::new);

    // A broken config file must not stop wrappers from launching.
    let (config, config_error) = if matches!(cli.command, Commands::Launch(_)) {
        Config::load_or_default(config_file)?
    } else {
        (Config::load(config_file)?, None)
    };

    // Initialize logging. Wrappers stay quiet unless asked otherwise.
    let log_level = if cli.verbose {
        "debug"
    } else if matches!(cli.command, Commands::Launch(_)) {
        "error"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    if let Some(err) = config_error {
        tracing::error!("Ignoring config file, using defaults: {:#}", err);
    }

    match cli.command {
        Commands::Generate(args) => cli::generate::run(args, &config),
        Commands::List(args) => cli::list::run(args, &config),
        Commands::Remove(args) => cli::remove::run(args, &config),
        Commands::Cleanup => cli::cleanup::run(&config),
        Commands::Pref(args) => cli::pref::run(args, &config),
        Commands::Resolve(args) => cli::resolve::run(args, &config),
        Commands::Launch(args) => cli::launch::run(args, &config),
        Commands::Paths => cli::paths::run(&config),
        Commands::Config(args) => cli::config::run(args, config),
    }
}
