//! `stagehand rebuild`

use anyhow::Result;
use colored::Colorize;

use super::Session;

pub fn run(session: &Session) -> Result<()> {
    let rebuilt = session.with_lifecycle(|lc| Ok(lc.rebuild()?))?;
    for repo in &rebuilt {
        println!("{} {} rebuilt ({})", "✓".green(), repo.repo, repo.release);
    }
    Ok(())
}
