use std::path::PathBuf;

use console::style;
use crudforge_codegen::{Confirm, DenyOverwrite};
use inquire::Confirm as Prompt;

/// Asks on the terminal before overwriting files that were edited locally
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm_overwrite(&self, paths: &[PathBuf]) -> bool {
        println!(
            "{} {} file(s) differ from what would be generated:",
            style("!").yellow().bold(),
            paths.len()
        );
        for path in paths {
            println!("  {}", style(path.display()).dim());
        }

        Prompt::new("Overwrite them?")
            .with_default(false)
            .with_help_message("Local edits in these files will be lost")
            .prompt()
            .unwrap_or(false)
    }
}

/// Prompt when a person is at the terminal, refuse otherwise
pub fn confirmer() -> Box<dyn Confirm> {
    if console::user_attended() {
        Box::new(TerminalConfirm)
    } else {
        Box::new(DenyOverwrite)
    }
}
