//! Producing release contents: source sync, checkout, build script, and
//! copy-forward of carried directories.
//!
//! [`ReleaseBuilder`] is the seam between the lifecycle and the outside
//! world. [`SystemBuilder`] drives the system `git` and `bash`; tests supply
//! their own implementation.

use std::path::{Path, PathBuf};
use std::process::Command;

use stagehand_core::{RepoConfig, RepoName};

use crate::error::{io_err, ReleaseError};
use crate::switcher::{symlink_dir, symlink_file};

/// Operations the lifecycle needs from version control and the build tool.
pub trait ReleaseBuilder {
    /// Bring the long-lived working clone at `source_dir` up to date, cloning
    /// it from the configured origin on first use.
    fn sync_source(
        &self,
        repo: &RepoName,
        config: &RepoConfig,
        source_dir: &Path,
    ) -> Result<(), ReleaseError>;

    /// Create a fresh checkout of `branch` at `release_dir`.
    fn checkout(&self, source_dir: &Path, branch: &str, release_dir: &Path)
        -> Result<(), ReleaseError>;

    /// Pull the latest `branch` into the existing checkout at `release_dir`.
    fn refresh(&self, source_dir: &Path, branch: &str, release_dir: &Path)
        -> Result<(), ReleaseError>;

    /// Run `script` with `release_dir` as the working directory.
    fn run_build(&self, release_dir: &Path, script: &Path) -> Result<(), ReleaseError>;
}

/// [`ReleaseBuilder`] backed by the system `git` and `bash` binaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBuilder;

impl SystemBuilder {
    fn git(dir: &Path) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(dir);
        cmd
    }

    /// Check out `branch` in the working clone, run `f`, then put the working
    /// clone back on whatever it was on before. Cleanup failures only warn.
    fn on_branch(
        source_dir: &Path,
        branch: &str,
        f: impl FnOnce() -> Result<(), ReleaseError>,
    ) -> Result<(), ReleaseError> {
        let previous = capture(
            Self::git(source_dir).args(["rev-parse", "--abbrev-ref", "HEAD"]),
            "git rev-parse --abbrev-ref HEAD",
            source_dir,
        )?;
        run(
            Self::git(source_dir).args(["checkout", "-f", branch]),
            &format!("git checkout -f {branch}"),
            source_dir,
        )?;

        let result = f();

        if previous != branch {
            let restored = run(
                Self::git(source_dir).args(["checkout", "-f", &previous]),
                &format!("git checkout -f {previous}"),
                source_dir,
            );
            match restored {
                Ok(()) => {
                    if let Err(err) = run(
                        Self::git(source_dir).args(["branch", "-d", branch]),
                        &format!("git branch -d {branch}"),
                        source_dir,
                    ) {
                        tracing::warn!("could not delete temporary branch '{branch}': {err}");
                    }
                }
                Err(err) => tracing::warn!("could not restore branch '{previous}': {err}"),
            }
        }
        result
    }
}

impl ReleaseBuilder for SystemBuilder {
    fn sync_source(
        &self,
        repo: &RepoName,
        config: &RepoConfig,
        source_dir: &Path,
    ) -> Result<(), ReleaseError> {
        if source_dir.join(".git").exists() {
            tracing::info!("updating source for '{repo}'");
            run(Self::git(source_dir).arg("pull"), "git pull", source_dir)?;
        } else {
            tracing::info!("cloning '{repo}' from {}", config.origin);
            std::fs::create_dir_all(source_dir).map_err(|e| io_err(source_dir, e))?;
            run(
                Command::new("git")
                    .arg("clone")
                    .arg(&config.origin)
                    .arg(source_dir),
                &format!("git clone {}", config.origin),
                source_dir,
            )?;
        }
        run(
            Self::git(source_dir).args(["remote", "prune", "origin"]),
            "git remote prune origin",
            source_dir,
        )
    }

    fn checkout(
        &self,
        source_dir: &Path,
        branch: &str,
        release_dir: &Path,
    ) -> Result<(), ReleaseError> {
        std::fs::create_dir_all(release_dir).map_err(|e| io_err(release_dir, e))?;
        let url = format!("file://{}", source_dir.display());
        Self::on_branch(source_dir, branch, || {
            run(
                Command::new("git").arg("clone").arg(&url).arg(release_dir),
                &format!("git clone {url}"),
                release_dir,
            )
        })
    }

    fn refresh(
        &self,
        source_dir: &Path,
        branch: &str,
        release_dir: &Path,
    ) -> Result<(), ReleaseError> {
        run(Self::git(source_dir).arg("pull"), "git pull", source_dir)?;
        Self::on_branch(source_dir, branch, || {
            run(Self::git(release_dir).arg("pull"), "git pull", release_dir)
        })
    }

    fn run_build(&self, release_dir: &Path, script: &Path) -> Result<(), ReleaseError> {
        tracing::info!("running {}", script.display());
        run(
            Command::new("bash").arg(script).current_dir(release_dir),
            &format!("bash {}", script.display()),
            release_dir,
        )
    }
}

fn run(cmd: &mut Command, label: &str, dir: &Path) -> Result<(), ReleaseError> {
    let status = cmd.status().map_err(|source| ReleaseError::CommandSpawn {
        command: label.to_owned(),
        source,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(ReleaseError::CommandFailed {
            command: label.to_owned(),
            dir: dir.to_path_buf(),
            code: status.code(),
        })
    }
}

fn capture(cmd: &mut Command, label: &str, dir: &Path) -> Result<String, ReleaseError> {
    let output = cmd.output().map_err(|source| ReleaseError::CommandSpawn {
        command: label.to_owned(),
        source,
    })?;
    if !output.status.success() {
        return Err(ReleaseError::CommandFailed {
            command: label.to_owned(),
            dir: dir.to_path_buf(),
            code: output.status.code(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// Copy each of `dirs` from the live release into the new one.
///
/// Directories absent from the live release are skipped. Symlinks are
/// recreated, not followed. Returns the destination paths that were written.
pub fn copy_forward(
    live_dir: &Path,
    release_dir: &Path,
    dirs: &[String],
) -> Result<Vec<PathBuf>, ReleaseError> {
    let mut copied = Vec::new();
    for dir in dirs {
        let from = live_dir.join(dir);
        if !from.is_dir() {
            tracing::debug!("nothing to copy forward at {}", from.display());
            continue;
        }
        let to = release_dir.join(dir);
        tracing::info!("copying {} -> {}", from.display(), to.display());
        copy_tree(&from, &to)?;
        copied.push(to);
    }
    Ok(copied)
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), ReleaseError> {
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            io_err(path, e.into())
        })?;
        let rel = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(rel);

        if entry.file_type().is_symlink() {
            let target = std::fs::read_link(entry.path()).map_err(|e| io_err(entry.path(), e))?;
            if std::fs::symlink_metadata(&dest).is_ok() {
                std::fs::remove_file(&dest).map_err(|e| io_err(&dest, e))?;
            }
            let made = if entry.path().is_dir() {
                symlink_dir(&target, &dest)
            } else {
                symlink_file(&target, &dest)
            };
            made.map_err(|e| io_err(&dest, e))?;
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).map_err(|e| io_err(&dest, e))?;
        } else {
            std::fs::copy(entry.path(), &dest).map_err(|e| io_err(&dest, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_forward_copies_listed_dirs_and_skips_missing() {
        let live = TempDir::new().unwrap();
        let release = TempDir::new().unwrap();
        std::fs::create_dir_all(live.path().join("node_modules/pkg")).unwrap();
        std::fs::write(live.path().join("node_modules/pkg/index.js"), "x").unwrap();
        std::fs::create_dir_all(live.path().join("app/vendor")).unwrap();
        std::fs::write(live.path().join("app/vendor/autoload.php"), "y").unwrap();

        let copied = copy_forward(
            live.path(),
            release.path(),
            &["node_modules".into(), "app/vendor".into(), "absent".into()],
        )
        .unwrap();

        assert_eq!(copied.len(), 2);
        assert_eq!(
            std::fs::read_to_string(release.path().join("node_modules/pkg/index.js")).unwrap(),
            "x"
        );
        assert_eq!(
            std::fs::read_to_string(release.path().join("app/vendor/autoload.php")).unwrap(),
            "y"
        );
        assert!(!release.path().join("absent").exists());
    }

    #[test]
    fn copy_forward_overwrites_existing_files() {
        let live = TempDir::new().unwrap();
        let release = TempDir::new().unwrap();
        std::fs::create_dir_all(live.path().join("cache")).unwrap();
        std::fs::write(live.path().join("cache/a"), "new").unwrap();
        std::fs::create_dir_all(release.path().join("cache")).unwrap();
        std::fs::write(release.path().join("cache/a"), "old").unwrap();

        copy_forward(live.path(), release.path(), &["cache".into()]).unwrap();
        assert_eq!(std::fs::read_to_string(release.path().join("cache/a")).unwrap(), "new");
    }

    #[test]
    #[cfg(unix)]
    fn copy_forward_recreates_symlinks() {
        let live = TempDir::new().unwrap();
        let release = TempDir::new().unwrap();
        std::fs::create_dir_all(live.path().join("node_modules/.bin")).unwrap();
        std::os::unix::fs::symlink("../tool/cli.js", live.path().join("node_modules/.bin/tool"))
            .unwrap();

        copy_forward(live.path(), release.path(), &["node_modules".into()]).unwrap();
        let link = release.path().join("node_modules/.bin/tool");
        assert_eq!(
            std::fs::read_link(link).unwrap(),
            PathBuf::from("../tool/cli.js")
        );
    }

    #[test]
    #[cfg(unix)]
    fn failing_build_script_is_fatal() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("build.sh");
        std::fs::write(&script, "exit 3\n").unwrap();

        let err = SystemBuilder.run_build(dir.path(), &script).unwrap_err();
        assert!(matches!(err, ReleaseError::CommandFailed { code: Some(3), .. }));
    }

    #[test]
    #[cfg(unix)]
    fn build_script_runs_in_release_dir() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("build.sh");
        std::fs::write(&script, "pwd > built.txt\n").unwrap();

        SystemBuilder.run_build(dir.path(), &script).unwrap();
        let built = std::fs::read_to_string(dir.path().join("built.txt")).unwrap();
        assert_eq!(
            std::fs::canonicalize(built.trim()).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }
}
