//! Event normalization: the admission filter both ingestion paths share.
//!
//! A push payload and a poll-query node have different shapes but carry the
//! same information; this module reduces either to a [`TriggerCandidate`]
//! or rejects it with `None`. Rejection is the common case (most state
//! changes are irrelevant) and is silent by design, logged at `debug` by
//! callers only.
//!
//! Filter rules are evaluated in order and short-circuit on the first
//! failure:
//!
//! 1. push only: the entity type must be `Issue` and the action `update`
//! 2. push only: a previous-state reference must be present (creations and
//!    non-state updates carry none)
//! 3. if a team key is configured, the work item's team prefix must match
//! 4. the new state must be the configured ready state

pub mod docpath;

pub use docpath::extract_doc_path;

use crate::config::Config;
use crate::tracker::IssueNode;
use crate::types::{StateId, WorkItemId};
use crate::webhooks::PushPayload;

/// Entity type for work items in push payloads.
const ENTITY_ISSUE: &str = "Issue";

/// Push action for field updates.
const ACTION_UPDATE: &str = "update";

/// A normalized "work item became ready" observation, source-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCandidate {
    pub work_item: WorkItemId,
    pub title: String,
    pub state_id: StateId,
    /// Document path extracted from the item body, if any.
    pub doc_path: Option<String>,
}

/// Normalizes a push payload, or rejects it with `None`.
pub fn normalize_push(payload: &PushPayload, config: &Config) -> Option<TriggerCandidate> {
    if payload.entity_type != ENTITY_ISSUE || payload.action != ACTION_UPDATE {
        return None;
    }

    // Events with no previous state (creations, or updates that did not
    // touch the state field) are not transitions.
    payload.updated_from.as_ref()?.state_id.as_ref()?;

    let work_item = WorkItemId::parse(payload.data.identifier.clone()?)?;
    if !team_matches(&work_item, config) {
        return None;
    }

    let state_id = StateId::new(payload.data.state_id.clone()?);
    if state_id != config.ready_state_id {
        return None;
    }

    Some(TriggerCandidate {
        doc_path: extract_doc_path(
            payload.data.description.as_deref(),
            &config.doc_root,
            &config.doc_ext,
        ),
        title: payload.data.title.clone().unwrap_or_default(),
        work_item,
        state_id,
    })
}

/// Normalizes a poll-query node, or rejects it with `None`.
///
/// Poll nodes carry only the current state, so the push-specific rules
/// (entity/action, previous-state presence) do not apply here; a node in
/// the ready state is a candidate and the ledger decides whether it has
/// been seen before.
pub fn normalize_poll(node: &IssueNode, config: &Config) -> Option<TriggerCandidate> {
    let work_item = WorkItemId::parse(node.identifier.clone())?;
    if !team_matches(&work_item, config) {
        return None;
    }

    let state_id = StateId::new(node.state.id.clone());
    if state_id != config.ready_state_id {
        return None;
    }

    Some(TriggerCandidate {
        doc_path: extract_doc_path(
            node.description.as_deref(),
            &config.doc_root,
            &config.doc_ext,
        ),
        title: node.title.clone().unwrap_or_default(),
        work_item,
        state_id,
    })
}

/// Rule 3: with no team key configured the filter is off.
fn team_matches(work_item: &WorkItemId, config: &Config) -> bool {
    match &config.team_key {
        Some(key) => work_item.team_prefix() == Some(key.as_str()),
        None => true,
    }
}
