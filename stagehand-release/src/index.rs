//! Release enumeration and branch markers.
//!
//! The release directory of a target is the source of truth for which
//! releases exist; nothing else is cached.

use std::path::{Path, PathBuf};

use stagehand_core::paths::BRANCH_MARKER;
use stagehand_core::{ReleaseId, RepoName};

use crate::error::{io_err, ReleaseError};

/// Read-only view over `releases/<target>/`.
#[derive(Debug, Clone)]
pub struct ReleaseIndex {
    root: PathBuf,
}

impl ReleaseIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Every release directory, sorted ascending. Plain files and names that
    /// are not valid path components are skipped.
    pub fn list(&self) -> Result<Vec<ReleaseId>, ReleaseError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.root).map_err(|e| io_err(&self.root, e))?;

        let mut releases = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.root, e))?;
            let file_type = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
            if !file_type.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::debug!("skipping non-UTF-8 release entry {}", entry.path().display());
                continue;
            };
            match ReleaseId::parse(name) {
                Ok(release) => releases.push(release),
                Err(err) => tracing::debug!("skipping release entry: {err}"),
            }
        }
        releases.sort();
        Ok(releases)
    }

    /// The newest release, if any.
    pub fn latest(&self) -> Result<Option<ReleaseId>, ReleaseError> {
        Ok(self.list()?.pop())
    }

    /// Branch recorded for `repo` in `release`; see [`read_branch_marker`].
    pub fn branch_of(&self, release: &ReleaseId, repo: &RepoName) -> String {
        read_branch_marker(&self.root.join(release.as_str()).join(&repo.0))
    }

    /// See [`previous_in`].
    pub fn previous_of(&self, current: Option<&ReleaseId>) -> Result<Option<ReleaseId>, ReleaseError> {
        Ok(previous_in(&self.list()?, current))
    }
}

/// The release immediately before `current` in `sorted`.
///
/// Falls back to the earliest release when `current` is absent, is not in the
/// list, or is already the earliest. `None` only for an empty list.
pub fn previous_in(sorted: &[ReleaseId], current: Option<&ReleaseId>) -> Option<ReleaseId> {
    let earliest = sorted.first()?;
    let position = current.and_then(|c| sorted.iter().position(|r| r == c));
    match position {
        Some(idx) if idx > 0 => Some(sorted[idx - 1].clone()),
        _ => Some(earliest.clone()),
    }
}

/// Branch recorded in a repo's release directory, or `""` if the marker is
/// missing or unreadable.
pub fn read_branch_marker(repo_release_dir: &Path) -> String {
    let path = repo_release_dir.join(BRANCH_MARKER);
    match std::fs::read_to_string(&path) {
        Ok(contents) => contents.trim().to_owned(),
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("cannot read branch marker {}: {err}", path.display());
            }
            String::new()
        }
    }
}

/// Record `branch` as the branch built into `repo_release_dir`.
pub fn write_branch_marker(repo_release_dir: &Path, branch: &str) -> Result<(), ReleaseError> {
    let path = repo_release_dir.join(BRANCH_MARKER);
    std::fs::write(&path, branch).map_err(|e| io_err(path, e))
}
