//! `stagehand build [<branch>...]`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::Session;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Branches to build, one per repository in config order. The last one
    /// is reused for any remaining repositories; with none, each repository
    /// rebuilds its current branch.
    pub branches: Vec<String>,
}

impl BuildArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let report = session.with_lifecycle(|lc| Ok(lc.build(&self.branches)?))?;
        for repo in &report.repos {
            println!("{} {} built from '{}'", "✓".green(), repo.repo, repo.branch);
        }
        println!("Release {} is ready. To make it live:", report.release.to_string().bold());
        println!("  {}", session.link_command(report.release.as_str()));
        Ok(())
    }
}
