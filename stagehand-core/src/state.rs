//! Repo state store: one JSON record per repository per target.
//!
//! Persists a [`RepoState`] at `info/<target>/<repo>.json`, pretty-printed
//! with four-space indentation. Reads never fail: a missing, unreadable or
//! corrupt file is "no prior state". Writes report success as a boolean and
//! use the same `.tmp` + rename pattern as the config writer, so a killed
//! process leaves either the old record or the new one.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::paths::TargetPaths;
use crate::types::{RepoName, RepoState};

/// Reads and writes state records under one directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_target(paths: &TargetPaths) -> Self {
        Self::new(&paths.info_root)
    }

    /// `<dir>/<repo>.json`. Pure, no I/O.
    pub fn path_for(&self, repo: &RepoName) -> PathBuf {
        self.dir.join(format!("{}.json", repo.0))
    }

    /// Load the record for `repo`, or the empty default.
    pub fn read(&self, repo: &RepoName) -> RepoState {
        let path = self.path_for(repo);
        if !path.exists() {
            return RepoState::default();
        }
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!("cannot read state {}: {err}", path.display());
                return RepoState::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!("ignoring corrupt state {}: {err}", path.display());
                RepoState::default()
            }
        }
    }

    /// Persist `state` for `repo`. Returns `false` if anything failed; the
    /// failure is logged, never raised.
    pub fn write(&self, repo: &RepoName, state: &RepoState) -> bool {
        let path = self.path_for(repo);
        match write_atomic(&path, state) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("failed to write state {}: {err}", path.display());
                false
            }
        }
    }
}

/// Serialise with four-space indentation and stable key order.
pub fn to_pretty_json(state: &RepoState) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    state.serialize(&mut ser)?;
    // serde_json only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_atomic(path: &Path, state: &RepoState) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = to_pretty_json(state).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReleaseId;
    use tempfile::TempDir;

    fn repo() -> RepoName {
        RepoName::from("api")
    }

    #[test]
    fn empty_record_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path());
        assert_eq!(store.read(&repo()), RepoState::default());
    }

    #[test]
    fn write_creates_directory_and_roundtrips() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("info").join("prod"));
        let state = RepoState::new(&ReleaseId::parse("20240101000000").unwrap(), "main");
        assert!(store.write(&repo(), &state));
        assert_eq!(store.read(&repo()), state);
    }

    #[test]
    fn file_uses_four_space_indent_and_stable_order() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path());
        let state = RepoState {
            current_release: "20240101000000".into(),
            current_branch: "main".into(),
        };
        store.write(&repo(), &state);
        let raw = std::fs::read_to_string(store.path_for(&repo())).unwrap();
        assert_eq!(
            raw,
            "{\n    \"currentRelease\": \"20240101000000\",\n    \"currentBranch\": \"main\"\n}"
        );
    }

    #[test]
    fn corrupt_file_reads_as_default() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path());
        std::fs::write(store.path_for(&repo()), "{not json").unwrap();
        assert_eq!(store.read(&repo()), RepoState::default());
    }

    #[test]
    fn partial_record_merges_with_defaults() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path());
        std::fs::write(
            store.path_for(&repo()),
            r#"{"currentRelease": "20240101000000", "legacy": true}"#,
        )
        .unwrap();
        let state = store.read(&repo());
        assert_eq!(state.current_release, "20240101000000");
        assert_eq!(state.current_branch, "");
    }

    #[test]
    fn tmp_file_cleaned_up_after_write() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path());
        store.write(&repo(), &RepoState::default());
        assert!(!store.path_for(&repo()).with_extension("json.tmp").exists());
    }

    #[test]
    #[cfg(unix)]
    fn write_failure_returns_false() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the state directory should be.
        let blocker = tmp.path().join("info");
        std::fs::write(&blocker, "").unwrap();
        let store = StateStore::new(blocker.join("prod"));
        assert!(!store.write(&repo(), &RepoState::default()));
    }
}
