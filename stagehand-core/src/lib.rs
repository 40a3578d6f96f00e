//! Stagehand core library: domain types, configuration, layout, state store.
//!
//! - [`types`]: newtypes, release identifiers, the persisted [`RepoState`]
//! - [`config`]: typed YAML configuration
//! - [`paths`]: per-target filesystem layout
//! - [`state`]: [`StateStore`] for `info/<target>/<repo>.json`
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod state;
pub mod types;

pub use config::{Config, RepoConfig, RepoMap, TargetConfig};
pub use error::{ConfigError, NameError};
pub use paths::TargetPaths;
pub use state::StateStore;
pub use types::{ReleaseId, RepoName, RepoState, TargetName};
