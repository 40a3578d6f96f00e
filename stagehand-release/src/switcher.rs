//! Symlink switcher.
//!
//! Repoints `current/<target>/<repo>` at a release directory and records the
//! new pointer in the state store, inside one guarded critical section.
//! The link is replaced by renaming a freshly created temporary symlink over
//! it, so at every instant it resolves to either the old or the new release.

use std::path::{Path, PathBuf};

use stagehand_core::{ReleaseId, RepoName, RepoState, StateStore, TargetPaths};

use crate::error::{io_err, ReleaseError};
use crate::guard::InterruptGuard;

/// Pointer state before a swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub old_release: String,
    pub old_branch: String,
    /// `false` if the link moved but the state record could not be written.
    pub persisted: bool,
}

pub struct Switcher<'a> {
    paths: &'a TargetPaths,
    store: &'a StateStore,
    guard: &'a InterruptGuard,
}

impl<'a> Switcher<'a> {
    pub fn new(paths: &'a TargetPaths, store: &'a StateStore, guard: &'a InterruptGuard) -> Self {
        Self {
            paths,
            store,
            guard,
        }
    }

    /// Check that every `(repo, release)` pair has a release directory and
    /// that no link path is occupied by something other than a symlink.
    /// Nothing is modified.
    pub fn preflight<'r>(
        &self,
        plan: impl IntoIterator<Item = (&'r RepoName, &'r ReleaseId)>,
    ) -> Result<(), ReleaseError> {
        for (repo, release) in plan {
            let dir = self.paths.repo_release_dir(release, repo);
            if !dir.is_dir() {
                return Err(ReleaseError::ReleaseNotFound { path: dir });
            }
            check_link_slot(&self.paths.link_path(repo))?;
        }
        Ok(())
    }

    /// Point `repo` at `release` and record `branch` as its current branch.
    pub fn swap(
        &self,
        repo: &RepoName,
        release: &ReleaseId,
        branch: &str,
    ) -> Result<SwapOutcome, ReleaseError> {
        let release_dir = self.paths.repo_release_dir(release, repo);
        if !release_dir.is_dir() {
            return Err(ReleaseError::ReleaseNotFound { path: release_dir });
        }
        let link = self.paths.link_path(repo);
        check_link_slot(&link)?;
        let target = std::fs::canonicalize(&release_dir).map_err(|e| io_err(&release_dir, e))?;

        self.guard.protect(|| {
            let previous = self.store.read(repo);
            point_link(&link, &target).map_err(|e| io_err(&link, e))?;
            tracing::info!("{repo}: {} -> {}", link.display(), target.display());
            let persisted = self.store.write(repo, &RepoState::new(release, branch));
            Ok(SwapOutcome {
                old_release: previous.current_release,
                old_branch: previous.current_branch,
                persisted,
            })
        })
    }
}

fn check_link_slot(link: &Path) -> Result<(), ReleaseError> {
    match std::fs::symlink_metadata(link) {
        Ok(meta) if !meta.file_type().is_symlink() => Err(ReleaseError::LinkOccupied {
            path: link.to_path_buf(),
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(link, e)),
    }
}

/// Atomically make `link` a symlink to `target`.
pub fn point_link(link: &Path, target: &Path) -> std::io::Result<()> {
    if let Some(dir) = link.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let tmp = temp_link_path(link);
    match std::fs::symlink_metadata(&tmp) {
        Ok(_) => std::fs::remove_file(&tmp)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    symlink_dir(target, &tmp)?;
    if let Err(err) = std::fs::rename(&tmp, link) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

fn temp_link_path(link: &Path) -> PathBuf {
    let name = link
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    link.with_file_name(format!(".{name}.stagehand.tmp"))
}

#[cfg(unix)]
pub(crate) fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub(crate) fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(unix)]
pub(crate) fn symlink_file(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub(crate) fn symlink_file(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
