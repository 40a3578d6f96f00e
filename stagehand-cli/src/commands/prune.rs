//! `stagehand prune [<count>|all]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stagehand_release::{Confirm, PruneOutcome, PruneSpec};

use super::Session;

#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Number of newest releases to keep, or "all" to consider every release.
    #[arg(value_name = "COUNT|all")]
    pub spec: Option<String>,
}

impl PruneArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let spec = match self.spec.as_deref() {
            Some(raw) => raw.parse::<PruneSpec>().context("invalid prune argument")?,
            None => PruneSpec::default(),
        };
        let mut inner = session.confirmer();
        let mut confirm = Listing {
            inner: inner.as_mut(),
            show_header: !session.global.yes,
        };
        let outcome = session.with_lifecycle(|lc| Ok(lc.prune(spec, &mut confirm)?))?;

        match outcome {
            PruneOutcome::NothingToPrune => println!("Nothing to prune."),
            PruneOutcome::Declined { selected } => {
                println!("Kept {} releases; nothing deleted.", selected.len());
            }
            PruneOutcome::Pruned { removed } => {
                for release in &removed {
                    println!("{} removed {release}", "✓".green());
                }
            }
        }
        Ok(())
    }
}

/// Prints a heading above the candidate list before asking.
struct Listing<'a> {
    inner: &'a mut dyn Confirm,
    show_header: bool,
}

impl Confirm for Listing<'_> {
    fn confirm(&mut self, question: &str, details: &[String]) -> bool {
        if self.show_header {
            println!("Releases selected for removal:");
            println!();
        }
        self.inner.confirm(question, details)
    }
}
