//! `stagehand deploy [<branch>...]`: build, confirm, link.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use stagehand_release::DeployOutcome;

use super::{print_hooks, print_swaps, Session};

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Branches to build; see `stagehand build --help`.
    pub branches: Vec<String>,
}

impl DeployArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let mut confirm = session.confirmer();
        let outcome =
            session.with_lifecycle(|lc| Ok(lc.deploy(&self.branches, confirm.as_mut())?))?;

        match outcome {
            DeployOutcome::Linked { link, .. } => {
                print_swaps(&link.swaps);
                print_hooks(link.hooks.as_ref());
                println!("{} release {} is live", "✓".green(), link.release);
            }
            DeployOutcome::Deferred { build } => {
                println!("Release {} was built but not linked.", build.release);
                println!("When you are ready, run:");
                println!("  {}", session.link_command(build.release.as_str()));
            }
        }
        Ok(())
    }
}
