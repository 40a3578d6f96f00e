//! Domain types for stagehand.
//!
//! Target and repository names end up as single path components under the
//! base directory, so every constructor that accepts user input validates
//! them with [`validate_component`].

use std::fmt;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::NameError;

/// `strftime` pattern for release identifiers. Fixed width, so lexical order
/// is chronological order.
pub const RELEASE_ID_FORMAT: &str = "%Y%m%d%H%M%S";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A named deployment environment (e.g. `prod`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetName(pub String);

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TargetName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TargetName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The name of a managed repository within a target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoName(pub String);

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A timestamp-derived release identifier, e.g. `20240105093000`.
///
/// Always a valid single path component. Ordering is plain string ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ReleaseId(String);

impl ReleaseId {
    /// Identifier for the current local wall-clock second.
    pub fn generate() -> Self {
        Self::at(Local::now())
    }

    /// Identifier for an explicit instant.
    pub fn at<Tz: TimeZone>(instant: DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(instant.format(RELEASE_ID_FORMAT).to_string())
    }

    /// Parse an operator- or filesystem-supplied release name.
    pub fn parse(value: &str) -> Result<Self, NameError> {
        validate_component("release", value)?;
        Ok(Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for ReleaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Persisted state
// ---------------------------------------------------------------------------

/// Per-repository pointer state, persisted as `info/<target>/<repo>.json`.
///
/// Empty strings mean "unknown". Field order is the on-disk key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepoState {
    pub current_release: String,
    pub current_branch: String,
}

impl RepoState {
    pub fn new(release: &ReleaseId, branch: impl Into<String>) -> Self {
        Self {
            current_release: release.as_str().to_owned(),
            current_branch: branch.into(),
        }
    }

    /// The current release, if one is recorded and still a valid name.
    pub fn release(&self) -> Option<ReleaseId> {
        if self.current_release.is_empty() {
            return None;
        }
        ReleaseId::parse(&self.current_release).ok()
    }

    /// The current branch, if one is recorded.
    pub fn branch(&self) -> Option<&str> {
        if self.current_branch.is_empty() {
            None
        } else {
            Some(&self.current_branch)
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject anything that is not exactly one normal path component.
pub fn validate_component(kind: &'static str, value: &str) -> Result<(), NameError> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value == "." || value == ".." {
        Some("must not be a relative directory reference")
    } else if value.contains('/') || value.contains('\\') {
        Some("must not contain path separators")
    } else if value.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(NameError {
            kind,
            value: value.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
