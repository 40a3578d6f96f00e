//! Error types for stagehand-hooks.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a dispatch before any hook runs.
///
/// Individual hook failures are not errors; they are recorded in the
/// [`DispatchReport`](crate::DispatchReport).
#[derive(Debug, Error)]
pub enum HookError {
    #[error("cannot list hook directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> HookError {
    HookError::Io {
        path: path.into(),
        source,
    }
}
