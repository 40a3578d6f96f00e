//! Release lifecycle: build, deploy, link, update, rollback, rebuild, list
//! and prune for one target.
//!
//! Every mutating operation holds the target's [`TargetLock`] for its whole
//! duration. Link changes go through the [`Switcher`], so each repo's link
//! and state record move together under the [`InterruptGuard`].

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use stagehand_core::{
    Config, ReleaseId, RepoConfig, RepoMap, RepoName, RepoState, StateStore, TargetName,
    TargetPaths,
};
use stagehand_hooks::{DeployInfo, DispatchReport, HookSettings};

use crate::builder::{copy_forward, ReleaseBuilder};
use crate::error::{io_err, ReleaseError};
use crate::guard::InterruptGuard;
use crate::index::{previous_in, write_branch_marker, ReleaseIndex};
use crate::lock::TargetLock;
use crate::retention::{select_for_pruning, PruneSpec};
use crate::switcher::{SwapOutcome, Switcher};

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Asks the operator a yes/no question.
pub trait Confirm {
    /// `details` are shown to the operator before `question`.
    fn confirm(&mut self, question: &str, details: &[String]) -> bool;
}

/// Answers every question with the same value.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _question: &str, _details: &[String]) -> bool {
        self.0
    }
}

/// Source of identifiers for new releases.
pub type ReleaseClock = Box<dyn Fn() -> ReleaseId>;

/// Command names, as exposed to hooks through `STAGEHAND_CMD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Build,
    Deploy,
    Link,
    Update,
    Rollback,
    Rebuild,
    List,
    Prune,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Deploy => "deploy",
            Self::Link => "link",
            Self::Update => "update",
            Self::Rollback => "rollback",
            Self::Rebuild => "rebuild",
            Self::List => "list",
            Self::Prune => "prune",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Switches from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleOptions {
    pub run_hooks: bool,
    pub copy_forward: bool,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            run_hooks: true,
            copy_forward: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRepo {
    pub repo: RepoName,
    pub branch: String,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub release: ReleaseId,
    pub repos: Vec<BuiltRepo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwappedRepo {
    pub repo: RepoName,
    pub release: ReleaseId,
    pub branch: String,
    pub previous: SwapOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub release: ReleaseId,
    pub swaps: Vec<SwappedRepo>,
    pub hooks: Option<DispatchReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Linked { build: BuildReport, link: LinkReport },
    /// The operator declined the swap; the release is built but not live.
    Deferred { build: BuildReport },
}

/// A repo whose current release was refreshed in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedRepo {
    pub repo: RepoName,
    pub release: ReleaseId,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub repos: Vec<RefreshedRepo>,
    pub hooks: Option<DispatchReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoBranch {
    pub repo: RepoName,
    pub branch: String,
}

/// One row of `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEntry {
    pub release: ReleaseId,
    /// Some repo's link currently points here.
    pub current: bool,
    pub branches: Vec<RepoBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneOutcome {
    NothingToPrune,
    Declined { selected: Vec<ReleaseId> },
    Pruned { removed: Vec<ReleaseId> },
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

pub struct Lifecycle<'a> {
    target: TargetName,
    repos: &'a RepoMap,
    paths: TargetPaths,
    store: StateStore,
    index: ReleaseIndex,
    guard: &'a InterruptGuard,
    builder: &'a dyn ReleaseBuilder,
    options: LifecycleOptions,
    hooks: HookSettings,
    clock: ReleaseClock,
}

impl<'a> Lifecycle<'a> {
    /// Resolve `target` against `config` and prepare its directories.
    ///
    /// Fails if the base directory does not exist; it is never created.
    pub fn new(
        config: &'a Config,
        target: TargetName,
        guard: &'a InterruptGuard,
        builder: &'a dyn ReleaseBuilder,
        options: LifecycleOptions,
    ) -> Result<Self, ReleaseError> {
        if !config.base_dir.is_dir() {
            return Err(ReleaseError::BaseDirMissing {
                path: config.base_dir.clone(),
            });
        }
        let repos = &config.target(&target)?.repos;
        let paths = TargetPaths::new(config, &target);
        paths
            .ensure_dirs()
            .map_err(|e| io_err(&paths.base_dir, e))?;

        Ok(Self {
            store: StateStore::for_target(&paths),
            index: ReleaseIndex::new(&paths.releases_root),
            target,
            repos,
            paths,
            guard,
            builder,
            options,
            hooks: HookSettings::new(&config.hook_interpreter, &config.hook_suffix),
            clock: Box::new(ReleaseId::generate),
        })
    }

    /// Replace the wall clock used to name new releases.
    pub fn with_clock(mut self, clock: impl Fn() -> ReleaseId + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn target(&self) -> &TargetName {
        &self.target
    }

    pub fn paths(&self) -> &TargetPaths {
        &self.paths
    }

    pub fn state(&self, repo: &RepoName) -> RepoState {
        self.store.read(repo)
    }

    // -- build / deploy ------------------------------------------------------

    /// Build a new release of every repo without making it live.
    ///
    /// `branches` are consumed one per repo in configuration order; the last
    /// one is reused for any remaining repos. With no branches, each repo
    /// rebuilds its recorded current branch.
    pub fn build(&self, branches: &[String]) -> Result<BuildReport, ReleaseError> {
        let _lock = self.lock()?;
        self.build_release(branches)
    }

    /// Build, then ask before making the new release live.
    pub fn deploy(
        &self,
        branches: &[String],
        confirm: &mut dyn Confirm,
    ) -> Result<DeployOutcome, ReleaseError> {
        let _lock = self.lock()?;
        let build = self.build_release(branches)?;
        let ready = confirm.confirm(
            "The release has now been built. Are you ready to swap the symlinks?",
            &[],
        );
        if !ready {
            tracing::info!("release {} built but not linked", build.release);
            return Ok(DeployOutcome::Deferred { build });
        }
        let link = self.link_release(&build.release, Operation::Deploy)?;
        Ok(DeployOutcome::Linked { build, link })
    }

    fn build_release(&self, branches: &[String]) -> Result<BuildReport, ReleaseError> {
        let plan = self.resolve_branches(branches)?;

        let release = (self.clock)();
        if let Some(latest) = self.index.latest()? {
            if latest >= release {
                return Err(ReleaseError::ReleaseIdCollision {
                    candidate: release.to_string(),
                    latest: latest.to_string(),
                });
            }
        }
        let release_root = self.paths.release_dir(&release);
        std::fs::create_dir_all(&release_root).map_err(|e| io_err(&release_root, e))?;
        tracing::info!("building release {release} for target '{}'", self.target);

        match self.populate_release(&release, plan) {
            Ok(built) => {
                tracing::info!("release {release} built");
                Ok(BuildReport {
                    release,
                    repos: built,
                })
            }
            Err(err) => {
                tracing::warn!("build of release {release} failed, removing it");
                if let Err(rm) = std::fs::remove_dir_all(&release_root) {
                    tracing::warn!("could not remove {}: {rm}", release_root.display());
                }
                Err(err)
            }
        }
    }

    /// Check out and build every repo into `release`. The branch marker is
    /// written last, so its presence means that repo built successfully.
    fn populate_release(
        &self,
        release: &ReleaseId,
        plan: Vec<(&RepoName, &RepoConfig, String)>,
    ) -> Result<Vec<BuiltRepo>, ReleaseError> {
        let mut built = Vec::with_capacity(plan.len());
        for (repo, config, branch) in plan {
            let source = self.paths.source_dir(repo);
            let dir = self.paths.repo_release_dir(release, repo);

            tracing::info!("{repo}: building branch '{branch}'");
            self.builder.sync_source(repo, config, &source)?;
            self.builder.checkout(&source, &branch, &dir)?;

            if self.options.copy_forward && !config.copy_dirs.is_empty() {
                copy_forward(&self.paths.link_path(repo), &dir, &config.copy_dirs)?;
            }
            self.run_build_script(&dir, &config.build_script)?;
            write_branch_marker(&dir, &branch)?;

            built.push(BuiltRepo {
                repo: repo.clone(),
                branch,
                dir,
            });
        }
        Ok(built)
    }

    fn resolve_branches(
        &self,
        branches: &[String],
    ) -> Result<Vec<(&RepoName, &RepoConfig, String)>, ReleaseError> {
        self.repos
            .iter()
            .enumerate()
            .map(|(idx, (repo, config))| {
                let explicit = branches.get(idx).or_else(|| branches.last());
                let branch = match explicit {
                    Some(branch) => branch.clone(),
                    None => self
                        .store
                        .read(repo)
                        .branch()
                        .map(str::to_owned)
                        .ok_or_else(|| ReleaseError::NoBranch { repo: repo.to_string() })?,
                };
                Ok((repo, config, branch))
            })
            .collect()
    }

    fn run_build_script(&self, dir: &Path, script: &Path) -> Result<(), ReleaseError> {
        let script = dir.join(script);
        if script.is_file() {
            self.builder.run_build(dir, &script)
        } else {
            tracing::info!("no build script at {}, skipping", script.display());
            Ok(())
        }
    }

    // -- link ----------------------------------------------------------------

    /// Make `release` live for every repo.
    pub fn link(&self, release: &str) -> Result<LinkReport, ReleaseError> {
        let release = ReleaseId::parse(release)?;
        let _lock = self.lock()?;
        self.link_release(&release, Operation::Link)
    }

    fn link_release(&self, release: &ReleaseId, op: Operation) -> Result<LinkReport, ReleaseError> {
        let switcher = self.switcher();
        switcher.preflight(self.repos.names().map(|repo| (repo, release)))?;

        let mut info = DeployInfo::new();
        let mut swaps = Vec::with_capacity(self.repos.len());
        for repo in self.repos.names() {
            let branch = self.index.branch_of(release, repo);
            let previous = switcher.swap(repo, release, &branch)?;
            info.record_old_branch(&previous.old_branch);
            info.record_new_branch(&branch);
            swaps.push(SwappedRepo {
                repo: repo.clone(),
                release: release.clone(),
                branch,
                previous,
            });
        }
        info.set_release_name(release.as_str());

        let hooks = self.fire_hooks(&info, op);
        Ok(LinkReport {
            release: release.clone(),
            swaps,
            hooks,
        })
    }

    // -- update / rebuild ----------------------------------------------------

    /// Pull the latest commits of each repo's current branch into its
    /// current release, in place, and re-run the build script.
    pub fn update(&self) -> Result<UpdateReport, ReleaseError> {
        let _lock = self.lock()?;
        let current = self.current_releases(true)?;

        let mut info = DeployInfo::new();
        let mut repos = Vec::with_capacity(current.len());
        for (entry, config) in current {
            let dir = self.paths.repo_release_dir(&entry.release, &entry.repo);
            tracing::info!("{}: updating {} on '{}'", entry.repo, entry.release, entry.branch);

            self.builder
                .refresh(&self.paths.source_dir(&entry.repo), &entry.branch, &dir)?;
            self.run_build_script(&dir, &config.build_script)?;

            info.record_old_branch(&entry.branch);
            info.record_new_branch(&entry.branch);
            info.set_release_name(entry.release.as_str());
            repos.push(entry);
        }

        let hooks = self.fire_hooks(&info, Operation::Update);
        Ok(UpdateReport { repos, hooks })
    }

    /// Re-run the build script in each repo's current release. No source
    /// changes, no link changes, no hooks.
    pub fn rebuild(&self) -> Result<Vec<RefreshedRepo>, ReleaseError> {
        let _lock = self.lock()?;
        let current = self.current_releases(false)?;
        let mut rebuilt = Vec::with_capacity(current.len());
        for (entry, config) in current {
            let dir = self.paths.repo_release_dir(&entry.release, &entry.repo);
            tracing::info!("{}: rebuilding {}", entry.repo, entry.release);
            self.run_build_script(&dir, &config.build_script)?;
            rebuilt.push(entry);
        }
        Ok(rebuilt)
    }

    /// Each repo's recorded release, checked to exist on disk before
    /// anything is touched.
    fn current_releases(
        &self,
        need_branch: bool,
    ) -> Result<Vec<(RefreshedRepo, &RepoConfig)>, ReleaseError> {
        let mut current = Vec::with_capacity(self.repos.len());
        for (repo, config) in self.repos.iter() {
            let state = self.store.read(repo);
            let release = state
                .release()
                .ok_or_else(|| ReleaseError::NoPriorState { repo: repo.to_string() })?;
            if need_branch && state.branch().is_none() {
                return Err(ReleaseError::NoPriorState { repo: repo.to_string() });
            }
            let dir = self.paths.repo_release_dir(&release, repo);
            if !dir.is_dir() {
                return Err(ReleaseError::ReleaseNotFound { path: dir });
            }
            let entry = RefreshedRepo {
                repo: repo.clone(),
                release,
                branch: state.current_branch,
            };
            current.push((entry, config));
        }
        Ok(current)
    }

    // -- rollback ------------------------------------------------------------

    /// Point each repo at the release before its current one. Hooks are not
    /// run.
    ///
    /// Releases missing a branch marker for any repo never finished building
    /// and are passed over.
    pub fn rollback(&self) -> Result<Vec<SwappedRepo>, ReleaseError> {
        let _lock = self.lock()?;
        let releases = self.index.list()?;

        let mut plan = Vec::with_capacity(self.repos.len());
        for repo in self.repos.names() {
            let current = self
                .store
                .read(repo)
                .release()
                .ok_or_else(|| ReleaseError::NoPriorState { repo: repo.to_string() })?;
            let candidates: Vec<ReleaseId> = releases
                .iter()
                .filter(|r| **r == current || self.is_complete(r))
                .cloned()
                .collect();
            let previous = previous_in(&candidates, Some(&current))
                .ok_or_else(|| ReleaseError::NoPredecessor { repo: repo.to_string() })?;
            if previous == current {
                tracing::warn!("{repo}: {current} is the earliest release, relinking it");
            }
            plan.push((repo, previous));
        }

        let switcher = self.switcher();
        switcher.preflight(plan.iter().map(|(repo, release)| (*repo, release)))?;

        let mut swaps = Vec::with_capacity(plan.len());
        for (repo, release) in plan {
            let branch = self.index.branch_of(&release, repo);
            let previous = switcher.swap(repo, &release, &branch)?;
            swaps.push(SwappedRepo {
                repo: repo.clone(),
                release,
                branch,
                previous,
            });
        }
        Ok(swaps)
    }

    // -- list / prune --------------------------------------------------------

    /// Every release, ascending, with the branches recorded in it.
    pub fn list(&self) -> Result<Vec<ReleaseEntry>, ReleaseError> {
        let referenced = self.referenced_releases();
        let entries = self
            .index
            .list()?
            .into_iter()
            .map(|release| {
                let branches = self
                    .repos
                    .names()
                    .filter(|repo| self.paths.branch_marker(&release, repo).exists())
                    .map(|repo| RepoBranch {
                        repo: repo.clone(),
                        branch: self.index.branch_of(&release, repo),
                    })
                    .collect();
                ReleaseEntry {
                    current: referenced.contains(&release),
                    release,
                    branches,
                }
            })
            .collect();
        Ok(entries)
    }

    /// Delete old releases per `spec`, after confirmation. Releases that any
    /// repo currently points at are never deleted.
    pub fn prune(
        &self,
        spec: PruneSpec,
        confirm: &mut dyn Confirm,
    ) -> Result<PruneOutcome, ReleaseError> {
        let _lock = self.lock()?;
        let releases = self.index.list()?;
        let selected: Vec<ReleaseId> =
            select_for_pruning(&releases, &self.referenced_releases(), spec)
                .into_iter()
                .collect();
        if selected.is_empty() {
            tracing::info!("no releases to prune");
            return Ok(PruneOutcome::NothingToPrune);
        }

        let details: Vec<String> = selected.iter().map(ToString::to_string).collect();
        if !confirm.confirm("Prune the above releases?", &details) {
            return Ok(PruneOutcome::Declined { selected });
        }

        for release in &selected {
            let dir = self.paths.release_dir(release);
            tracing::info!("removing {}", dir.display());
            std::fs::remove_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
        Ok(PruneOutcome::Pruned { removed: selected })
    }

    // -- helpers -------------------------------------------------------------

    fn lock(&self) -> Result<TargetLock, ReleaseError> {
        TargetLock::acquire(&self.paths.lock_path())
    }

    fn switcher(&self) -> Switcher<'_> {
        Switcher::new(&self.paths, &self.store, self.guard)
    }

    fn is_complete(&self, release: &ReleaseId) -> bool {
        self.repos
            .names()
            .all(|repo| self.paths.branch_marker(release, repo).is_file())
    }

    fn referenced_releases(&self) -> BTreeSet<ReleaseId> {
        self.repos
            .names()
            .filter_map(|repo| self.store.read(repo).release())
            .collect()
    }

    fn fire_hooks(&self, info: &DeployInfo, op: Operation) -> Option<DispatchReport> {
        if !self.options.run_hooks {
            tracing::info!("hooks disabled, skipping");
            return None;
        }
        match stagehand_hooks::dispatch(&self.paths.hook_dir, &self.hooks, info, op.as_str()) {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::warn!("could not run hooks: {err}");
                None
            }
        }
    }
}
