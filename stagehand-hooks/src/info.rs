//! Deploy info: the environment handed to every hook of one invocation.

use std::collections::BTreeMap;

use serde::Serialize;

pub const OLD_BRANCH: &str = "OLD_BRANCH";
pub const NEW_BRANCH: &str = "NEW_BRANCH";
pub const RELEASE_NAME: &str = "RELEASE_NAME";
/// Carries the name of the command that triggered the hooks.
pub const COMMAND: &str = "STAGEHAND_CMD";
/// Set to `true` for every hook process; scripts use it to self-activate.
pub const DEPLOY_HOOK: &str = "DEPLOY_HOOK";

/// Environment variables accumulated while a command runs.
///
/// `OLD_BRANCH` and `NEW_BRANCH` keep the first value recorded: the first
/// repository processed defines them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployInfo {
    vars: BTreeMap<String, String>,
}

impl DeployInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_old_branch(&mut self, branch: &str) {
        self.set_once(OLD_BRANCH, branch);
    }

    pub fn record_new_branch(&mut self, branch: &str) {
        self.set_once(NEW_BRANCH, branch);
    }

    pub fn set_release_name(&mut self, release: &str) {
        self.vars.insert(RELEASE_NAME.to_string(), release.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn set_once(&mut self, key: &str, value: &str) {
        self.vars
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
}
