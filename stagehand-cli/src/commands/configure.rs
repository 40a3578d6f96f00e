//! `stagehand configure [--force]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stagehand_core::config;

use super::Session;

#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

impl ConfigureArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let path = session.config_path()?;
        config::write_example_at(&path, self.force)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("{} wrote example configuration to {}", "✓".green(), path.display());
        println!("  Edit base_dir and targets before running other commands.");
        Ok(())
    }
}
