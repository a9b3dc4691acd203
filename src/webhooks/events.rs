//! Typed representation of tracker push payloads.
//!
//! The tracker delivers loosely-typed JSON; this module parses it into a
//! typed [`PushPayload`]. Fields are `Option` wherever the tracker may omit
//! them, and the admission filter in [`crate::normalize`] decides which
//! omissions matter. Parsing only fails on JSON that is not an object of
//! roughly the expected shape.

use serde::Deserialize;
use thiserror::Error;

/// Error type for push payload parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A push notification body as delivered by the tracker.
///
/// Example (abbreviated):
///
/// ```json
/// {
///   "type": "Issue",
///   "action": "update",
///   "data": {
///     "identifier": "CRU-123",
///     "title": "Fix the frobnicator",
///     "description": "See docs/specs/frobnicator.md",
///     "stateId": "state-ready"
///   },
///   "updatedFrom": { "stateId": "state-backlog" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    /// Entity type, e.g. `"Issue"`.
    #[serde(rename = "type")]
    pub entity_type: String,

    /// What happened to the entity, e.g. `"update"` or `"create"`.
    pub action: String,

    /// The entity's current field values.
    pub data: PushIssueData,

    /// Previous values of the fields that changed. Absent for creations.
    #[serde(rename = "updatedFrom", default)]
    pub updated_from: Option<UpdatedFrom>,
}

/// Current issue fields carried in a push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PushIssueData {
    /// Human-readable id, e.g. `CRU-123`.
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Current workflow state id.
    #[serde(rename = "stateId", default)]
    pub state_id: Option<String>,
}

/// Previous field values for an update event.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatedFrom {
    /// The state the issue was in before this update, if the state changed.
    #[serde(rename = "stateId", default)]
    pub state_id: Option<String>,
}

/// Parses a raw push body into a [`PushPayload`].
///
/// Returns `Err` only for malformed JSON; events of irrelevant type or
/// action parse fine and are rejected later by the normalizer.
pub fn parse_push(payload: &[u8]) -> Result<PushPayload, ParseError> {
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_full_update_payload() {
        let body = serde_json::to_vec(&json!({
            "type": "Issue",
            "action": "update",
            "data": {
                "identifier": "CRU-123",
                "title": "Fix the frobnicator",
                "description": "See docs/specs/frobnicator.md",
                "stateId": "state-ready"
            },
            "updatedFrom": { "stateId": "state-backlog" }
        }))
        .unwrap();

        let parsed = parse_push(&body).unwrap();
        assert_eq!(parsed.entity_type, "Issue");
        assert_eq!(parsed.action, "update");
        assert_eq!(parsed.data.identifier.as_deref(), Some("CRU-123"));
        assert_eq!(parsed.data.state_id.as_deref(), Some("state-ready"));
        assert_eq!(
            parsed.updated_from.unwrap().state_id.as_deref(),
            Some("state-backlog")
        );
    }

    #[test]
    fn parse_creation_without_updated_from() {
        let body = serde_json::to_vec(&json!({
            "type": "Issue",
            "action": "create",
            "data": { "identifier": "CRU-1", "stateId": "state-backlog" }
        }))
        .unwrap();

        let parsed = parse_push(&body).unwrap();
        assert_eq!(parsed.action, "create");
        assert!(parsed.updated_from.is_none());
    }

    #[test]
    fn parse_tolerates_unknown_fields() {
        let body = serde_json::to_vec(&json!({
            "type": "Issue",
            "action": "update",
            "data": {
                "identifier": "CRU-2",
                "stateId": "s1",
                "priority": 2,
                "assignee": { "name": "someone" }
            },
            "updatedFrom": { "stateId": "s0", "priority": 1 },
            "webhookTimestamp": 1700000000
        }))
        .unwrap();

        assert!(parse_push(&body).is_ok());
    }

    #[test]
    fn parse_rejects_non_json() {
        assert!(parse_push(b"not json at all").is_err());
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        let body = serde_json::to_vec(&json!({ "hello": "world" })).unwrap();
        assert!(parse_push(&body).is_err());
    }
}
