//! # stagehand-hooks
//!
//! Post-transition notification hooks.
//!
//! Build a [`DeployInfo`] while a command runs, then call [`dispatch`] to run
//! every `hook_*.js` script (or whatever [`HookSettings`] names) in the
//! target's hook directory.

pub mod dispatch;
pub mod error;
pub mod info;

pub use dispatch::{
    discover, dispatch, is_hook_name, DispatchReport, HookEntry, HookOutcome, HookRun,
    HookSettings, DEFAULT_HOOK_INTERPRETER, DEFAULT_HOOK_SUFFIX,
};
pub use error::HookError;
pub use info::DeployInfo;
