//! Trigger ledger endpoints: inspection and out-of-band abandonment.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::AppState;
use crate::ledger::{LedgerError, TriggerRecord};
use crate::status::{LedgerSummary, summarize};
use crate::types::WorkItemId;

/// Errors from the trigger endpoints.
#[derive(Debug, Error)]
pub enum TriggersError {
    /// No active trigger record exists for the work item.
    #[error("no active trigger for {0}")]
    NotFound(WorkItemId),

    /// Ledger IO or serialization failure.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for TriggersError {
    fn into_response(self) -> Response {
        let status = match &self {
            TriggersError::NotFound(_) => StatusCode::NOT_FOUND,
            TriggersError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Response body for `GET /api/v1/triggers`.
#[derive(Debug, Serialize)]
pub struct TriggerListing {
    pub summary: LedgerSummary,
    pub triggers: Vec<TriggerRecord>,
}

/// Returns every ledger record, oldest first, with a per-status summary.
pub async fn list_triggers_handler(
    State(app_state): State<AppState>,
) -> Result<Json<TriggerListing>, TriggersError> {
    let records = app_state.ledger().lock().await.load()?;
    Ok(Json(TriggerListing {
        summary: summarize(&records),
        triggers: records,
    }))
}

/// Abandons the active trigger for a work item.
///
/// Skipping re-arms the item: its next observed ready transition admits a
/// fresh record. Answers 404 when no active record exists.
pub async fn skip_trigger_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, &'static str), TriggersError> {
    let work_item = WorkItemId::new(id);

    let skipped = app_state.ledger().lock().await.mark_skipped(&work_item)?;
    if !skipped {
        return Err(TriggersError::NotFound(work_item));
    }

    info!(work_item = %work_item, "trigger skipped by operator");
    Ok((StatusCode::OK, "Skipped"))
}
