//! `stagehand list [--json]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use stagehand_release::ReleaseEntry;

use super::Session;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ReleaseRow {
    #[tabled(rename = "release")]
    release: String,
    #[tabled(rename = "live")]
    live: String,
    #[tabled(rename = "branches")]
    branches: String,
}

impl ListArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let (target, entries) =
            session.with_lifecycle(|lc| Ok((lc.target().clone(), lc.list()?)))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&entries).context("failed to serialize releases")?
            );
            return Ok(());
        }

        println!("Releases for target '{}':", target.to_string().bold());
        if entries.is_empty() {
            println!("No releases built yet.");
            return Ok(());
        }
        let mut table = Table::new(entries.iter().map(row));
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn row(entry: &ReleaseEntry) -> ReleaseRow {
    let branches = entry
        .branches
        .iter()
        .map(|b| format!("{}: {}", b.repo, b.branch))
        .collect::<Vec<_>>()
        .join(", ");
    ReleaseRow {
        release: entry.release.to_string(),
        live: if entry.current {
            "*".green().to_string()
        } else {
            String::new()
        },
        branches,
    }
}
