//! Error types for stagehand-release.

use std::path::PathBuf;

use thiserror::Error;

use stagehand_core::{ConfigError, NameError};

/// All fatal errors from lifecycle operations.
///
/// Recoverable conditions (corrupt state files, failed state writes, failing
/// hooks) never surface here; they are logged and absorbed.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Name(#[from] NameError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot find base directory ({path}); please create or mount it first")]
    BaseDirMissing { path: PathBuf },

    #[error("cannot find release directory at {path}")]
    ReleaseNotFound { path: PathBuf },

    #[error("cannot find current release information for '{repo}'")]
    NoPriorState { repo: String },

    #[error("no branch specified and no saved branch name to use for '{repo}'")]
    NoBranch { repo: String },

    #[error("cannot determine previous release for '{repo}'")]
    NoPredecessor { repo: String },

    /// The freshly generated identifier does not sort after every existing
    /// release (same-second rebuild, or the clock moved backwards).
    #[error("release id {candidate} does not sort after existing release {latest}; retry in a moment")]
    ReleaseIdCollision { candidate: String, latest: String },

    #[error("invalid prune spec '{spec}': expected a number of releases to keep or \"all\"")]
    InvalidPruneSpec { spec: String },

    #[error("target is locked by another stagehand process ({path})")]
    Locked { path: PathBuf },

    #[error("refusing to replace {path}: it exists and is not a symlink")]
    LinkOccupied { path: PathBuf },

    #[error("`{command}` failed in {dir} (exit code: {})", code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    CommandFailed {
        command: String,
        dir: PathBuf,
        code: Option<i32>,
    },

    #[error("cannot run `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`ReleaseError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReleaseError {
    ReleaseError::Io {
        path: path.into(),
        source,
    }
}
