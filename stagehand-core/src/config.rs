//! Typed configuration loaded from `~/.stagehand.yaml`.
//!
//! # File shape
//!
//! ```yaml
//! default_target: prod
//! base_dir: /Prod
//! targets:
//!   prod:
//!     repos:
//!       web-ui:
//!         origin: git@github.com:example/web-ui
//!         build_script: build.sh
//!         copy_dirs: [node_modules]
//! ```
//!
//! Unknown keys are rejected and every name is validated at load time, so the
//! rest of the workspace can index paths with configuration values directly.
//!
//! # API pattern
//!
//! `load_at(path)` takes an explicit file; `load()` derives
//! `~/.stagehand.yaml` from `dirs::home_dir()` and delegates. Tests always use
//! the `_at` forms.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{io_err, ConfigError};
use crate::types::{validate_component, RepoName, TargetName};

/// File name of the per-user configuration, relative to `$HOME`.
pub const CONFIG_FILE_NAME: &str = ".stagehand.yaml";

/// Example configuration written by `stagehand configure`.
pub const EXAMPLE_CONFIG: &str = include_str!("../stagehand.example.yaml");

// ---------------------------------------------------------------------------
// 1. Types
// ---------------------------------------------------------------------------

/// Root of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_target")]
    pub default_target: TargetName,
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_release_dir")]
    pub release_dir: String,
    #[serde(default = "default_link_dir")]
    pub link_dir: String,
    #[serde(default = "default_repo_dir")]
    pub repo_dir: String,
    #[serde(default = "default_info_dir")]
    pub info_dir: String,
    #[serde(default = "default_hook_dir")]
    pub hook_dir: String,
    /// Program that runs each hook script.
    #[serde(default = "default_hook_interpreter")]
    pub hook_interpreter: String,
    /// File name suffix a hook must carry after `hook_`.
    #[serde(default = "default_hook_suffix")]
    pub hook_suffix: String,
    #[serde(default)]
    pub targets: BTreeMap<TargetName, TargetConfig>,
}

/// A deployment target: its repositories, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    #[serde(default)]
    pub repos: RepoMap,
}

/// One managed repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    /// Clone URL for the long-lived working copy.
    pub origin: String,
    /// Build script, relative to the release directory.
    #[serde(default = "default_build_script")]
    pub build_script: PathBuf,
    /// Dependency directories copied forward from the live release.
    #[serde(default)]
    pub copy_dirs: Vec<String>,
}

/// Ordered repository mapping. YAML mappings keep their key order here, and
/// that order is the processing order for every command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoMap(pub Vec<(RepoName, RepoConfig)>);

impl RepoMap {
    pub fn iter(&self) -> impl Iterator<Item = (&RepoName, &RepoConfig)> {
        self.0.iter().map(|(name, cfg)| (name, cfg))
    }

    pub fn names(&self) -> impl Iterator<Item = &RepoName> {
        self.0.iter().map(|(name, _)| name)
    }

    pub fn get(&self, name: &RepoName) -> Option<&RepoConfig> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, cfg)| cfg)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RepoMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, cfg) in &self.0 {
            map.serialize_entry(&name.0, cfg)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RepoMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RepoMapVisitor;

        impl<'de> Visitor<'de> for RepoMapVisitor {
            type Value = RepoMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of repository name to repository config")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RepoMap, A::Error> {
                let mut repos = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, cfg)) = access.next_entry::<String, RepoConfig>()? {
                    repos.push((RepoName::from(name), cfg));
                }
                Ok(RepoMap(repos))
            }
        }

        deserializer.deserialize_map(RepoMapVisitor)
    }
}

fn default_target() -> TargetName {
    TargetName::from("prod")
}
fn default_base_dir() -> PathBuf {
    PathBuf::from("/Prod")
}
fn default_release_dir() -> String {
    "releases".to_string()
}
fn default_link_dir() -> String {
    "current".to_string()
}
fn default_repo_dir() -> String {
    "repos".to_string()
}
fn default_info_dir() -> String {
    "info".to_string()
}
fn default_hook_dir() -> String {
    "hooks".to_string()
}
fn default_hook_interpreter() -> String {
    "node".to_string()
}
fn default_hook_suffix() -> String {
    ".js".to_string()
}
fn default_build_script() -> PathBuf {
    PathBuf::from("build.sh")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// `<home>/.stagehand.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE_NAME)
}

/// `~/.stagehand.yaml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

/// Load and validate the configuration at `path`.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line context) if malformed, `ConfigError::Invalid` if a rule is broken.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    from_yaml_str(&contents, path)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&default_config_path()?)
}

/// Parse and validate YAML. `origin` is only used in error messages.
pub fn from_yaml_str(contents: &str, origin: &Path) -> Result<Config, ConfigError> {
    let mut config: Config = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: origin.to_path_buf(),
        source: e,
    })?;
    config
        .validate()
        .map_err(|message| ConfigError::Invalid {
            path: origin.to_path_buf(),
            message,
        })?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// 3. Validation and lookup
// ---------------------------------------------------------------------------

impl Config {
    /// Check names and paths, normalising `copy_dirs` entries in place.
    fn validate(&mut self) -> Result<(), String> {
        for (key, value) in [
            ("release_dir", &self.release_dir),
            ("link_dir", &self.link_dir),
            ("repo_dir", &self.repo_dir),
            ("info_dir", &self.info_dir),
            ("hook_dir", &self.hook_dir),
        ] {
            validate_component("directory", value).map_err(|e| format!("{key}: {e}"))?;
        }
        validate_component("target", &self.default_target.0)
            .map_err(|e| format!("default_target: {e}"))?;
        if self.hook_interpreter.trim().is_empty() {
            return Err("hook_interpreter is empty".to_string());
        }
        if self.hook_suffix.contains(['/', '\\']) {
            return Err(format!(
                "hook_suffix '{}' must not contain a path separator",
                self.hook_suffix
            ));
        }

        for (target, tconf) in self.targets.iter_mut() {
            validate_component("target", &target.0).map_err(|e| e.to_string())?;

            let mut seen = HashSet::new();
            for (repo, rconf) in tconf.repos.0.iter_mut() {
                validate_component("repository", &repo.0)
                    .map_err(|e| format!("targets.{target}: {e}"))?;
                if !seen.insert(repo.0.clone()) {
                    return Err(format!("targets.{target}: duplicate repository '{repo}'"));
                }
                if rconf.origin.trim().is_empty() {
                    return Err(format!("targets.{target}.repos.{repo}: origin is empty"));
                }
                if !is_plain_relative(&rconf.build_script) {
                    return Err(format!(
                        "targets.{target}.repos.{repo}: build_script '{}' must be a relative path inside the release",
                        rconf.build_script.display()
                    ));
                }
                for dir in rconf.copy_dirs.iter_mut() {
                    let trimmed = dir.trim_matches('/').to_string();
                    if trimmed.is_empty() || !is_plain_relative(Path::new(&trimmed)) {
                        return Err(format!(
                            "targets.{target}.repos.{repo}: copy_dirs entry '{dir}' must be a relative path inside the release"
                        ));
                    }
                    *dir = trimmed;
                }
            }
        }
        Ok(())
    }

    /// The explicitly requested target, or `default_target`.
    pub fn resolve_target(&self, explicit: Option<&str>) -> Result<TargetName, ConfigError> {
        match explicit {
            Some(name) => {
                validate_component("target", name)?;
                Ok(TargetName::from(name))
            }
            None => Ok(self.default_target.clone()),
        }
    }

    /// Look up a target, failing if it is unknown or has no repositories.
    pub fn target(&self, name: &TargetName) -> Result<&TargetConfig, ConfigError> {
        let tconf = self
            .targets
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTarget {
                target: name.0.clone(),
                available: self.target_list(),
            })?;
        if tconf.repos.is_empty() {
            return Err(ConfigError::NoRepositories {
                target: name.0.clone(),
            });
        }
        Ok(tconf)
    }

    fn target_list(&self) -> String {
        if self.targets.is_empty() {
            return "none".to_string();
        }
        self.targets
            .keys()
            .map(|t| t.0.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}

// ---------------------------------------------------------------------------
// 4. Example config (configure)
// ---------------------------------------------------------------------------

/// Write [`EXAMPLE_CONFIG`] to `path` via a `.tmp` sibling and rename.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn write_example_at(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, EXAMPLE_CONFIG).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
