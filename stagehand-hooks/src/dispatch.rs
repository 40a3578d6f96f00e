//! Hook discovery and sequential, best-effort execution.
//!
//! Only entries named `hook_*<suffix>` are ever executed, via the configured
//! interpreter (`hook_*.js` with `node` by default). Everything else in the
//! hook directory is reported and skipped, whatever its contents or mode.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::error::{io_err, HookError};
use crate::info::{self, DeployInfo};

/// Required file name prefix.
pub const HOOK_PREFIX: &str = "hook_";
/// Default file name suffix.
pub const DEFAULT_HOOK_SUFFIX: &str = ".js";
/// Default program used to run accepted hooks.
pub const DEFAULT_HOOK_INTERPRETER: &str = "node";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// How hooks are recognised and started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSettings {
    /// Program invoked as `<interpreter> <hook path>`.
    pub interpreter: String,
    /// Required file name suffix, e.g. `.js`.
    pub suffix: String,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_HOOK_INTERPRETER.to_string(),
            suffix: DEFAULT_HOOK_SUFFIX.to_string(),
        }
    }
}

impl HookSettings {
    pub fn new(interpreter: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            suffix: suffix.into(),
        }
    }

    /// `true` if `file_name` matches `hook_*<suffix>`.
    pub fn accepts(&self, file_name: &str) -> bool {
        is_hook_name(file_name, &self.suffix)
    }
}

/// A directory entry classified by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEntry {
    Accepted(PathBuf),
    Rejected(PathBuf),
}

/// How a single hook ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Succeeded,
    /// Exited non-zero; `code` is `None` when killed by a signal.
    Failed { code: Option<i32> },
    /// The interpreter could not be started.
    SpawnFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookRun {
    pub path: PathBuf,
    pub outcome: HookOutcome,
}

/// Everything that happened during one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub ran: Vec<HookRun>,
    pub rejected: Vec<PathBuf>,
}

impl DispatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &HookRun> {
        self.ran
            .iter()
            .filter(|run| run.outcome != HookOutcome::Succeeded)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// `true` if `file_name` matches `hook_*<suffix>`.
pub fn is_hook_name(file_name: &str, suffix: &str) -> bool {
    file_name.len() >= HOOK_PREFIX.len() + suffix.len()
        && file_name.starts_with(HOOK_PREFIX)
        && file_name.ends_with(suffix)
}

/// List `hook_dir` in name order and classify each entry.
///
/// A missing directory has no hooks. Entries that cannot be read are logged
/// and left out.
pub fn discover(hook_dir: &Path, settings: &HookSettings) -> Result<Vec<HookEntry>, HookError> {
    if !hook_dir.exists() {
        return Ok(vec![]);
    }
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(hook_dir).map_err(|e| io_err(hook_dir, e))? {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!("skipping unreadable entry in '{}': {err}", hook_dir.display())
            }
        }
    }
    entries.sort_by_key(|e| e.file_name());

    Ok(entries
        .into_iter()
        .map(|entry| {
            let path = entry.path();
            let accepted = entry
                .file_name()
                .to_str()
                .is_some_and(|name| settings.accepts(name))
                && entry.file_type().map(|t| !t.is_dir()).unwrap_or(false);
            if accepted {
                HookEntry::Accepted(path)
            } else {
                HookEntry::Rejected(path)
            }
        })
        .collect())
}

/// Run every accepted hook in `hook_dir`, one after another.
///
/// Each hook is started as `<interpreter> <path>`. It inherits this process's
/// environment plus `deploy_info`,
/// `STAGEHAND_CMD=<command>` and `DEPLOY_HOOK=true`, and runs with `hook_dir`
/// as its working directory. A failing hook is logged and recorded; the
/// remaining hooks still run.
pub fn dispatch(
    hook_dir: &Path,
    settings: &HookSettings,
    deploy_info: &DeployInfo,
    command: &str,
) -> Result<DispatchReport, HookError> {
    let entries = discover(hook_dir, settings)?;
    let mut report = DispatchReport::default();
    if entries.is_empty() {
        return Ok(report);
    }

    tracing::info!("running hooks...");
    for entry in entries {
        match entry {
            HookEntry::Rejected(path) => {
                tracing::warn!("refusing to run mis-named '{}'", path.display());
                report.rejected.push(path);
            }
            HookEntry::Accepted(path) => {
                tracing::info!("running hook '{}'", path.display());
                let outcome = run_hook(&settings.interpreter, &path, hook_dir, deploy_info, command);
                match &outcome {
                    HookOutcome::Succeeded => {}
                    HookOutcome::Failed { code } => tracing::warn!(
                        "hook '{}' failed (exit code: {})",
                        path.display(),
                        code.map_or_else(|| "signal".to_string(), |c| c.to_string())
                    ),
                    HookOutcome::SpawnFailed { message } => {
                        tracing::warn!("error running hook '{}': {message}", path.display())
                    }
                }
                report.ran.push(HookRun { path, outcome });
            }
        }
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn run_hook(
    interpreter: &str,
    path: &Path,
    hook_dir: &Path,
    deploy_info: &DeployInfo,
    command: &str,
) -> HookOutcome {
    let mut cmd = Command::new(interpreter);
    cmd.arg(path).current_dir(hook_dir);
    for (key, value) in deploy_info.iter() {
        cmd.env(key, value);
    }
    cmd.env(info::COMMAND, command).env(info::DEPLOY_HOOK, "true");

    match cmd.status() {
        Ok(status) => outcome_of(status),
        Err(err) => HookOutcome::SpawnFailed {
            message: err.to_string(),
        },
    }
}

fn outcome_of(status: ExitStatus) -> HookOutcome {
    if status.success() {
        HookOutcome::Succeeded
    } else {
        HookOutcome::Failed {
            code: status.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_has_no_hooks() {
        let tmp = TempDir::new().unwrap();
        let entries = discover(&tmp.path().join("absent"), &HookSettings::default()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn discover_sorts_by_name() {
        let tmp = TempDir::new().unwrap();
        for name in ["hook_b.js", "hook_a.js", "README"] {
            std::fs::write(tmp.path().join(name), "").unwrap();
        }
        let entries = discover(tmp.path(), &HookSettings::default()).unwrap();
        assert_eq!(
            entries,
            vec![
                HookEntry::Rejected(tmp.path().join("README")),
                HookEntry::Accepted(tmp.path().join("hook_a.js")),
                HookEntry::Accepted(tmp.path().join("hook_b.js")),
            ]
        );
    }

    #[test]
    fn suffix_follows_settings() {
        let tmp = TempDir::new().unwrap();
        for name in ["hook_a.js", "hook_b.sh"] {
            std::fs::write(tmp.path().join(name), "").unwrap();
        }
        let entries = discover(tmp.path(), &HookSettings::new("sh", ".sh")).unwrap();
        assert_eq!(
            entries,
            vec![
                HookEntry::Rejected(tmp.path().join("hook_a.js")),
                HookEntry::Accepted(tmp.path().join("hook_b.sh")),
            ]
        );
    }

    #[test]
    fn directory_named_like_a_hook_is_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("hook_dir.js")).unwrap();
        let entries = discover(tmp.path(), &HookSettings::default()).unwrap();
        assert!(matches!(entries[0], HookEntry::Rejected(_)));
    }

    #[test]
    fn empty_report_has_no_failures() {
        assert_eq!(DispatchReport::default().failures().count(), 0);
    }
}
