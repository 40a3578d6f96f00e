//! `stagehand update`

use anyhow::Result;
use colored::Colorize;

use super::{print_hooks, Session};

pub fn run(session: &Session) -> Result<()> {
    let report = session.with_lifecycle(|lc| Ok(lc.update()?))?;
    for repo in &report.repos {
        println!(
            "{} {} updated in place ({} on '{}')",
            "✓".green(),
            repo.repo,
            repo.release,
            repo.branch
        );
    }
    print_hooks(report.hooks.as_ref());
    Ok(())
}
