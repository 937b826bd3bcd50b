use anyhow::Result;

use crate::apps::AppSource;
use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let resolver = super::system_resolver(config);
    let installed = super::flatpak_source(&resolver)?.installed_apps()?;

    let removed = super::wrapper_manager(config).cleanup(&installed)?;
    for name in &removed {
        println!("removed   {}", name);
    }
    println!("{} stale wrapper(s) removed", removed.len());
    Ok(())
}
