//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID kinds (e.g., using a
//! tracker state id where a work item id is expected) and make the code more
//! self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A work item identifier as issued by the tracker, e.g. `CRU-123`.
///
/// By convention these are an uppercase team prefix, a dash, and a number.
/// The type does not enforce the full convention; it only rejects emptiness
/// at construction sites that call [`WorkItemId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub String);

impl WorkItemId {
    /// Creates a new id without validation.
    pub fn new(s: impl Into<String>) -> Self {
        WorkItemId(s.into())
    }

    /// Creates an id, rejecting empty input.
    pub fn parse(s: impl Into<String>) -> Option<Self> {
        let s = s.into();
        if s.trim().is_empty() {
            return None;
        }
        Some(WorkItemId(s))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the team prefix (the part before the first `-`), if any.
    ///
    /// `CRU-123` yields `Some("CRU")`; an id without a dash yields `None`.
    pub fn team_prefix(&self) -> Option<&str> {
        let (prefix, rest) = self.0.split_once('-')?;
        if prefix.is_empty() || rest.is_empty() {
            return None;
        }
        Some(prefix)
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkItemId {
    fn from(s: String) -> Self {
        WorkItemId(s)
    }
}

impl From<&str> for WorkItemId {
    fn from(s: &str) -> Self {
        WorkItemId(s.to_string())
    }
}

/// An opaque tracker workflow-state identifier.
///
/// The tracker assigns these (typically UUIDs); the bot only ever compares
/// them for equality against the configured ready-state id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(pub String);

impl StateId {
    pub fn new(s: impl Into<String>) -> Self {
        StateId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StateId {
    fn from(s: String) -> Self {
        StateId(s)
    }
}

impl From<&str> for StateId {
    fn from(s: &str) -> Self {
        StateId(s.to_string())
    }
}
