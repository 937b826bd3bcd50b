//! Terminal prompt shown the first time a wrapper finds both programs.

use std::path::Path;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::error::{FplaunchError, Result};
use crate::wrapper::LauncherName;

use super::decision::{PromptReply, Prompter};
use super::preference::Choice;

const MAX_ATTEMPTS: usize = 3;

/// Map one line of input to a choice. Empty input picks the default
/// (system).
pub fn parse_reply(input: &str) -> Option<Choice> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "s" | "system" => Some(Choice::System),
        "2" | "f" | "flatpak" => Some(Choice::Flatpak),
        _ => None,
    }
}

/// Prompts on the controlling terminal. Only constructed once the caller has
/// checked that stdin and stdout are terminals.
#[derive(Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, name: &LauncherName, candidate: &Path, app_id: &str) -> Result<PromptReply> {
        let mut rl = DefaultEditor::new().map_err(|e| FplaunchError::Prompt(e.to_string()))?;

        eprintln!("Both a system and a Flatpak version of '{}' are installed:", name);
        eprintln!("  1) System   {}", candidate.display());
        eprintln!("  2) Flatpak  {}", app_id);
        eprintln!("Your answer is remembered; change it later with `fplaunch pref {}`.", name);

        for _ in 0..MAX_ATTEMPTS {
            match rl.readline("Choice [1]: ") {
                Ok(line) => match parse_reply(&line) {
                    Some(choice) => return Ok(PromptReply::Chose(choice)),
                    None => eprintln!("Please answer 1 (system) or 2 (flatpak)."),
                },
                Err(ReadlineError::Interrupted) => return Ok(PromptReply::Cancelled),
                Err(ReadlineError::Eof) => return Ok(PromptReply::Closed),
                Err(e) => return Err(FplaunchError::Prompt(e.to_string())),
            }
        }
        // Repeated nonsense counts as no answer.
        Ok(PromptReply::Closed)
    }
}
