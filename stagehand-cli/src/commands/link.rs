//! `stagehand link <release>`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{print_hooks, print_swaps, Session};

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Release identifier, as shown by `stagehand list`.
    pub release: String,
}

impl LinkArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let report = session.with_lifecycle(|lc| Ok(lc.link(&self.release)?))?;
        print_swaps(&report.swaps);
        print_hooks(report.hooks.as_ref());
        println!("{} release {} is live", "✓".green(), report.release);
        Ok(())
    }
}
