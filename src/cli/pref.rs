use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::config::Config;
use crate::launch::Choice;
use crate::wrapper::LauncherName;

#[derive(Args)]
pub struct PrefArgs {
    /// Launcher name of the wrapper
    pub name: String,

    /// New preference
    #[arg(value_enum)]
    pub value: PrefValue,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PrefValue {
    System,
    Flatpak,
    /// Forget the stored choice and ask again next time
    Clear,
}

pub fn run(args: PrefArgs, config: &Config) -> Result<()> {
    let name = LauncherName::parse(&args.name)?;
    let choice = match args.value {
        PrefValue::System => Some(Choice::System),
        PrefValue::Flatpak => Some(Choice::Flatpak),
        PrefValue::Clear => None,
    };

    super::wrapper_manager(config).set_preference(&name, choice)?;
    match choice {
        Some(choice) => println!("{} will launch the {} version", name, choice),
        None => println!("Cleared preference for {}", name),
    }
    Ok(())
}
