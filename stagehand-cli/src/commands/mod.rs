//! One module per subcommand, plus the [`Session`] they share.

pub mod build;
pub mod configure;
pub mod deploy;
pub mod link;
pub mod list;
pub mod prune;
pub mod rebuild;
pub mod rollback;
pub mod update;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use stagehand_core::{config, Config};
use stagehand_hooks::DispatchReport;
use stagehand_release::{
    AutoConfirm, Confirm, InterruptGuard, Lifecycle, LifecycleOptions, SwappedRepo, SystemBuilder,
};

use crate::prompt::StdinPrompt;
use crate::GlobalArgs;

/// Global options plus process-wide state for one invocation.
pub struct Session {
    pub global: GlobalArgs,
    guard: Arc<InterruptGuard>,
}

impl Session {
    pub fn new(global: GlobalArgs, guard: Arc<InterruptGuard>) -> Self {
        Self { global, guard }
    }

    /// `--config`, `$STAGEHAND_CONFIG`, or `~/.stagehand.yaml`.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.global.config {
            Some(path) => Ok(path.clone()),
            None => Ok(config::default_config_path()?),
        }
    }

    pub fn load_config(&self) -> Result<Config> {
        let path = self.config_path()?;
        config::load_at(&path).with_context(|| format!("failed to load {}", path.display()))
    }

    /// Build a [`Lifecycle`] for the selected target and hand it to `f`.
    pub fn with_lifecycle<T>(&self, f: impl FnOnce(&Lifecycle<'_>) -> Result<T>) -> Result<T> {
        let config = self.load_config()?;
        let target = config.resolve_target(self.global.target.as_deref())?;
        let builder = SystemBuilder;
        let options = LifecycleOptions {
            run_hooks: !self.global.no_hooks,
            copy_forward: !self.global.no_copy,
        };
        let lifecycle = Lifecycle::new(&config, target, &self.guard, &builder, options)?;
        f(&lifecycle)
    }

    /// Interactive prompt, or automatic yes under `--yes`.
    pub fn confirmer(&self) -> Box<dyn Confirm> {
        if self.global.yes {
            Box::new(AutoConfirm(true))
        } else {
            Box::new(StdinPrompt::new())
        }
    }

    /// The command an operator would type to link `release` later.
    pub fn link_command(&self, release: &str) -> String {
        match &self.global.target {
            Some(target) => format!("$ stagehand -t {target} link {release}"),
            None => format!("$ stagehand link {release}"),
        }
    }
}

pub(crate) fn print_swaps(swaps: &[SwappedRepo]) {
    for swap in swaps {
        let from = if swap.previous.old_release.is_empty() {
            "(none)".to_string()
        } else {
            swap.previous.old_release.clone()
        };
        println!(
            "{} {}: {} -> {} ({})",
            "✓".green(),
            swap.repo,
            from,
            swap.release,
            swap.branch
        );
        if !swap.previous.persisted {
            println!(
                "  {} state for '{}' was not saved; rollback may be inaccurate",
                "!".yellow(),
                swap.repo
            );
        }
    }
}

pub(crate) fn print_hooks(report: Option<&DispatchReport>) {
    let Some(report) = report else {
        return;
    };
    for rejected in &report.rejected {
        println!("{} skipped mis-named hook {}", "!".yellow(), rejected.display());
    }
    let failed = report.failures().count();
    if failed > 0 {
        println!(
            "{} {failed} of {} hooks failed",
            "!".yellow(),
            report.ran.len()
        );
    } else if !report.ran.is_empty() {
        println!("{} {} hooks ran", "✓".green(), report.ran.len());
    }
}
