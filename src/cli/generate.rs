//! CLI subcommand: `fplaunch generate`

use anyhow::{Context, Result};
use clap::Args;

use crate::config::Config;
use crate::wrapper::GenerationReport;

#[derive(Args)]
pub struct GenerateArgs {
    /// Application ids to wrap (default: every installed Flatpak app)
    pub ids: Vec<String>,

    /// Also remove wrappers for apps not in this batch
    #[arg(long)]
    pub prune: bool,
}

pub fn run(args: GenerateArgs, config: &Config) -> Result<()> {
    let launcher = std::env::current_exe()
        .and_then(|p| p.canonicalize())
        .context("Cannot determine the fplaunch executable path")?;
    let manager = super::wrapper_manager(config);
    let blocklist = &config.wrappers.blocklist;

    let report = if args.ids.is_empty() {
        let resolver = super::system_resolver(config);
        let source = super::flatpak_source(&resolver)?;
        manager.generate_from(&source, &launcher, blocklist, args.prune)?
    } else {
        manager.generate(&args.ids, &launcher, blocklist, args.prune)?
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &GenerationReport) {
    for name in &report.created {
        println!("created   {}", name);
    }
    for name in &report.updated {
        println!("updated   {}", name);
    }
    for skipped in &report.skipped {
        match &skipped.name {
            Some(name) => println!("skipped   {} ({}): {}", name, skipped.id, skipped.reason),
            None => println!("skipped   {:?}: {}", skipped.id, skipped.reason),
        }
    }
    for name in &report.removed {
        println!("removed   {}", name);
    }
    println!(
        "{} created, {} updated, {} unchanged, {} skipped, {} removed",
        report.created.len(),
        report.updated.len(),
        report.unchanged.len(),
        report.skipped.len(),
        report.removed.len()
    );
}
