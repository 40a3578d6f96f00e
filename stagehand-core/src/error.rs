//! Error types for stagehand-core.

use std::path::PathBuf;

use thiserror::Error;

/// A name that cannot be used as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} name '{value}': {reason}")]
pub struct NameError {
    pub kind: &'static str,
    pub value: String,
    pub reason: &'static str,
}

/// All errors that can arise while loading or querying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path and serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed but violates a structural rule.
    #[error("invalid config at {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or pass --config")]
    HomeNotFound,

    /// No configuration file at the expected path.
    #[error("no config file found at {path}; run `stagehand configure` to create one")]
    NotFound { path: PathBuf },

    /// `configure` would overwrite an existing file.
    #[error("config file already exists at {path}; pass --force to overwrite")]
    AlreadyExists { path: PathBuf },

    /// The selected target is not present in `targets`.
    #[error("unknown target '{target}' (configured: {available})")]
    UnknownTarget { target: String, available: String },

    /// The selected target exists but lists no repositories.
    #[error("target '{target}' has no repository configuration")]
    NoRepositories { target: String },

    #[error(transparent)]
    Name(#[from] NameError),
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
