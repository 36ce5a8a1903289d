use crate::error::{ForceRmError, Result};
use colored::*;
use dialoguer::Confirm;
use std::path::PathBuf;

pub struct ConfirmPrompt;

impl ConfirmPrompt {
    pub fn new() -> Self {
        Self
    }

    /// Show the batch and ask before anything is deleted. Defaults to no.
    pub fn confirm_removal(&self, paths: &[PathBuf]) -> Result<bool> {
        eprintln!("\n{}", "[>] Directories to delete:".cyan().bold());
        for path in paths {
            eprintln!("  {}", path.display().to_string().red());
        }

        Confirm::new()
            .with_prompt(format!(
                "Delete {} selected directories? This cannot be undone.",
                paths.len()
            ))
            .default(false)
            .interact()
            .map_err(|_| ForceRmError::UserCancelled)
    }
}

impl Default for ConfirmPrompt {
    fn default() -> Self {
        Self::new()
    }
}
