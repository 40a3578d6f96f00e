//! Filesystem layout for one target.
//!
//! ```text
//! <base_dir>/
//!   releases/<target>/<release>/<repo>/_REPOBRANCH.info
//!   current/<target>/<repo>            -> releases/<target>/<release>/<repo>
//!   info/<target>/<repo>.json
//!   info/<target>/.stagehand.lock
//!   hooks/<target>/hook_*.js
//!   repos/<repo>/                      (shared across targets)
//! ```

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::types::{ReleaseId, RepoName, TargetName};

/// Sidecar file inside each release directory holding the built branch.
pub const BRANCH_MARKER: &str = "_REPOBRANCH.info";

/// Advisory lock file inside the target's info directory.
pub const LOCK_FILE: &str = ".stagehand.lock";

/// Resolved directories for a single target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPaths {
    pub base_dir: PathBuf,
    pub releases_root: PathBuf,
    pub link_root: PathBuf,
    pub info_root: PathBuf,
    pub hook_dir: PathBuf,
    pub repo_root: PathBuf,
}

impl TargetPaths {
    /// Pure, no I/O.
    pub fn new(config: &Config, target: &TargetName) -> Self {
        let base = &config.base_dir;
        Self {
            base_dir: base.clone(),
            releases_root: base.join(&config.release_dir).join(&target.0),
            link_root: base.join(&config.link_dir).join(&target.0),
            info_root: base.join(&config.info_dir).join(&target.0),
            hook_dir: base.join(&config.hook_dir).join(&target.0),
            repo_root: base.join(&config.repo_dir),
        }
    }

    /// `releases/<target>/<release>`
    pub fn release_dir(&self, release: &ReleaseId) -> PathBuf {
        self.releases_root.join(release.as_str())
    }

    /// `releases/<target>/<release>/<repo>`
    pub fn repo_release_dir(&self, release: &ReleaseId, repo: &RepoName) -> PathBuf {
        self.release_dir(release).join(&repo.0)
    }

    /// `releases/<target>/<release>/<repo>/_REPOBRANCH.info`
    pub fn branch_marker(&self, release: &ReleaseId, repo: &RepoName) -> PathBuf {
        self.repo_release_dir(release, repo).join(BRANCH_MARKER)
    }

    /// `current/<target>/<repo>`
    pub fn link_path(&self, repo: &RepoName) -> PathBuf {
        self.link_root.join(&repo.0)
    }

    /// `info/<target>/<repo>.json`
    pub fn state_path(&self, repo: &RepoName) -> PathBuf {
        self.info_root.join(format!("{}.json", repo.0))
    }

    /// `repos/<repo>`
    pub fn source_dir(&self, repo: &RepoName) -> PathBuf {
        self.repo_root.join(&repo.0)
    }

    /// `info/<target>/.stagehand.lock`
    pub fn lock_path(&self) -> PathBuf {
        self.info_root.join(LOCK_FILE)
    }

    /// Create the per-target directories if absent.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in self.managed_dirs() {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    fn managed_dirs(&self) -> [&Path; 4] {
        [
            &self.info_root,
            &self.link_root,
            &self.releases_root,
            &self.hook_dir,
        ]
    }
}
