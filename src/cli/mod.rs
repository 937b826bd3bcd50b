pub mod cleanup;
pub mod config;
pub mod generate;
pub mod launch;
pub mod list;
pub mod paths;
pub mod pref;
pub mod remove;
pub mod resolve;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::apps::FlatpakCli;
use crate::config::Config;
use crate::resolver::{ResolverConfig, SystemBinaryResolver};
use crate::wrapper::WrapperManager;

#[derive(Parser)]
#[command(name = "fplaunch")]
#[command(
    author,
    version,
    about = "Short-named launchers that choose between system and Flatpak apps"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "FPLAUNCH_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or refresh wrappers for installed Flatpak apps
    Generate(generate::GenerateArgs),

    /// List generated wrappers
    List(list::ListArgs),

    /// Remove one generated wrapper
    Remove(remove::RemoveArgs),

    /// Remove wrappers whose app is no longer installed
    Cleanup,

    /// Set or clear the stored launch preference of a wrapper
    Pref(pref::PrefArgs),

    /// Show which system binary a wrapper would run
    Resolve(resolve::ResolveArgs),

    /// Entry point used by generated wrappers
    #[command(hide = true)]
    Launch(launch::LaunchArgs),

    /// Show resolved directory paths
    Paths,

    /// Configuration management
    Config(config::ConfigArgs),
}

/// Resolver configured from `[resolver]` and the caller's `PATH`.
pub(crate) fn system_resolver(config: &Config) -> SystemBinaryResolver {
    let path_env = std::env::var("PATH").ok();
    SystemBinaryResolver::new(ResolverConfig::from_settings(
        &config.resolver,
        &config.paths.home,
        path_env.as_deref(),
    ))
}

pub(crate) fn wrapper_manager(config: &Config) -> WrapperManager {
    WrapperManager::new(&config.paths).with_lock_timing(config.lock_timeout(), config.poll_interval())
}

/// The installed-app source backed by the system `flatpak` binary.
pub(crate) fn flatpak_source(resolver: &SystemBinaryResolver) -> Result<FlatpakCli> {
    let flatpak = resolver
        .resolve("flatpak", None)
        .context("flatpak is not installed in any system directory")?;
    Ok(FlatpakCli::new(&flatpak.path))
}
