//! # stagehand-release
//!
//! Release lifecycle for one target: building timestamped releases,
//! switching the live symlinks, rolling back, refreshing in place, listing
//! and pruning.
//!
//! [`Lifecycle`] is the entry point used by the CLI. The pieces it composes
//! are public for direct use and testing:
//!
//! - [`index`]: release enumeration and branch markers
//! - [`switcher`]: guarded atomic link swaps
//! - [`guard`]: deferral of termination during critical sections
//! - [`builder`]: git checkout, build scripts, copy-forward
//! - [`retention`]: prune selection
//! - [`lock`]: per-target advisory lock

pub mod builder;
pub mod error;
pub mod guard;
pub mod index;
pub mod lifecycle;
pub mod lock;
pub mod retention;
pub mod switcher;

pub use builder::{copy_forward, ReleaseBuilder, SystemBuilder};
pub use error::ReleaseError;
pub use guard::{InterruptGuard, INTERRUPTED_EXIT_CODE};
pub use index::ReleaseIndex;
pub use lifecycle::{
    AutoConfirm, BuildReport, BuiltRepo, Confirm, DeployOutcome, Lifecycle, LifecycleOptions,
    LinkReport, Operation, PruneOutcome, RefreshedRepo, ReleaseEntry, RepoBranch, SwappedRepo,
    UpdateReport,
};
pub use lock::TargetLock;
pub use retention::{PruneSpec, DEFAULT_KEEP};
pub use switcher::{SwapOutcome, Switcher};
