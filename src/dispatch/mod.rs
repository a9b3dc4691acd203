//! Direct dispatch to the downstream execution subsystem.
//!
//! Dispatch is an optimization, not a requirement: the admitted `pending`
//! ledger record is the durable fallback queue, and anything that can read
//! the ledger can drain it later. A failed, timed-out, or impossible
//! (no spawner configured) direct dispatch is therefore logged and
//! swallowed; it never changes the record and never aborts ingestion.
//!
//! The outcome is a two-variant enum consumed only for the ledger status
//! update and logging, never for control flow beyond that.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub mod http;

pub use http::HttpSpawner;

use crate::config::Config;
use crate::ledger::TriggerRecord;

/// Execution mode sent with every spawn request.
const SPAWN_MODE: &str = "run";

/// Errors a spawner implementation may report.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The execution subsystem rejected or failed the request.
    #[error("spawn failed: {0}")]
    Failed(String),

    /// The subsystem is not reachable right now.
    #[error("execution subsystem unavailable: {0}")]
    Unavailable(String),
}

/// A work-spawn request handed to the execution subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpawnRequest {
    /// Synthesized task description.
    pub task: String,

    /// Short label for the spawned work, the work item id.
    pub label: String,

    /// Always `"run"`.
    pub mode: &'static str,
}

/// Seam to the downstream execution subsystem.
///
/// The runtime may have no implementation configured; callers treat that
/// as an ordinary not-delivered outcome.
#[async_trait]
pub trait WorkSpawner: Send + Sync {
    async fn spawn(&self, request: &SpawnRequest) -> Result<(), SpawnError>;
}

/// Outcome of a direct-dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The execution subsystem acknowledged the request (or dry-run mode
    /// made the attempt trivially successful).
    Delivered,

    /// No spawner, spawn failure, or timeout. The ledger record stays
    /// `pending` for out-of-band draining.
    NotDelivered,
}

/// Builds the task description for a trigger record.
///
/// When no document path was extracted from the item body, the task falls
/// back to an instruction to search the configured document root.
pub fn synthesize_task(record: &TriggerRecord, doc_root: &str) -> SpawnRequest {
    let doc_hint = match &record.auxiliary_path {
        Some(path) => format!("The relevant document is at {}.", path),
        None => format!(
            "No document path was found; search {} for documents relevant to this item.",
            doc_root
        ),
    };

    let task = format!(
        "Work item {} is ready to start: {}\n{}",
        record.work_item_id, record.title, doc_hint
    );

    SpawnRequest {
        task,
        label: record.work_item_id.as_str().to_string(),
        mode: SPAWN_MODE,
    }
}

/// Attempts direct dispatch for an admitted trigger record.
///
/// Bounded by the configured dispatch timeout; a timeout is the same as
/// any other failure. In dry-run mode no call is made and the outcome is
/// `Delivered`.
pub async fn dispatch_trigger(
    spawner: Option<&dyn WorkSpawner>,
    record: &TriggerRecord,
    config: &Config,
) -> DispatchOutcome {
    if config.dry_run {
        info!(work_item = %record.work_item_id, "dry-run: skipping dispatch");
        return DispatchOutcome::Delivered;
    }

    let Some(spawner) = spawner else {
        info!(
            work_item = %record.work_item_id,
            "no execution subsystem configured; record left pending"
        );
        return DispatchOutcome::NotDelivered;
    };

    let request = synthesize_task(record, &config.doc_root);
    match timeout_spawn(spawner, &request, config.dispatch_timeout).await {
        Ok(()) => {
            info!(work_item = %record.work_item_id, "dispatched work item");
            DispatchOutcome::Delivered
        }
        Err(e) => {
            warn!(
                work_item = %record.work_item_id,
                error = %e,
                "direct dispatch failed; record left pending"
            );
            DispatchOutcome::NotDelivered
        }
    }
}

async fn timeout_spawn(
    spawner: &dyn WorkSpawner,
    request: &SpawnRequest,
    limit: Duration,
) -> Result<(), SpawnError> {
    match tokio::time::timeout(limit, spawner.spawn(request)).await {
        Ok(result) => result,
        Err(_) => Err(SpawnError::Unavailable(format!(
            "dispatch timed out after {:?}",
            limit
        ))),
    }
}
