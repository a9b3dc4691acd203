//! Trigger record types: the unit of the durable ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{StateId, WorkItemId};

/// Which ingestion path produced a record. Provenance only; dedup never
/// looks at this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Webhook,
    Poll,
}

/// Lifecycle status of a trigger record.
///
/// `pending → spawned` when dispatch is acknowledged; `pending|spawned →
/// skipped` via the out-of-band abandonment operation. `skipped` records
/// never block a fresh admission for the same work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerStatus {
    Pending,
    Spawned,
    Skipped,
}

/// One admitted ready-transition for a work item, as stored in the ledger
/// (one JSON object per line, camelCase field names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRecord {
    pub work_item_id: WorkItemId,

    pub title: String,

    /// The tracker state that caused admission (the configured ready state
    /// at admission time).
    pub target_state_id: StateId,

    pub triggered_at: DateTime<Utc>,

    pub source: TriggerSource,

    pub status: TriggerStatus,

    /// Document path extracted from the item body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_path: Option<String>,
}

impl TriggerRecord {
    /// An active record blocks further admissions for its work item.
    pub fn is_active(&self) -> bool {
        matches!(self.status, TriggerStatus::Pending | TriggerStatus::Spawned)
    }
}
