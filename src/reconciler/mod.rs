//! Periodic reconciliation against the tracker.
//!
//! Webhook deliveries can be lost; the reconciler closes that gap by
//! sweeping the most recently updated work items on an interval and
//! pushing anything still in the ready state through the same ingestion
//! pipeline as the push path. The ledger makes the overlap harmless:
//! re-observing an already-actioned item is a no-op.
//!
//! A sweep failure (tracker down, rate limited) is logged and the loop
//! waits for the next tick. One bad item never aborts a sweep.

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::ingest::{self, IngestOutcome};
use crate::ledger::TriggerSource;
use crate::normalize::normalize_poll;
use crate::server::AppState;
use crate::status::summarize;
use crate::tracker::{IssueNode, TrackerClient, TrackerError};

/// Counters for one poll sweep, for the completion log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Items returned by the tracker query.
    pub fetched: usize,

    /// Candidates that wrote a new ledger record.
    pub admitted: usize,

    /// Candidates rejected by an existing active record.
    pub duplicates: usize,

    /// Candidates whose ingestion failed.
    pub errors: usize,
}

/// Runs one sweep: fetch recently updated items, ingest the ready ones.
pub async fn poll_once(
    state: &AppState,
    tracker: &TrackerClient,
) -> Result<PollStats, TrackerError> {
    let config = state.config();
    let nodes = tracker
        .recently_updated(config.team_key.as_deref(), config.poll_limit)
        .await?;

    let stats = ingest_nodes(state, &nodes).await;

    let summary = {
        let ledger = state.ledger().lock().await;
        ledger.load().map(|r| summarize(&r)).unwrap_or_default()
    };
    info!(
        fetched = stats.fetched,
        admitted = stats.admitted,
        duplicates = stats.duplicates,
        errors = stats.errors,
        ledger = %summary,
        "poll sweep complete"
    );
    Ok(stats)
}

async fn ingest_nodes(state: &AppState, nodes: &[IssueNode]) -> PollStats {
    let mut stats = PollStats {
        fetched: nodes.len(),
        ..PollStats::default()
    };

    for node in nodes {
        let Some(candidate) = normalize_poll(node, state.config()) else {
            continue;
        };

        let outcome = ingest::process_candidate(
            state.ledger(),
            state.spawner(),
            state.config(),
            candidate,
            TriggerSource::Poll,
        )
        .await;

        match outcome {
            Ok(IngestOutcome::Duplicate(_)) => stats.duplicates += 1,
            Ok(_) => stats.admitted += 1,
            Err(e) => {
                error!(
                    work_item = %node.identifier,
                    error = %e,
                    "poll ingestion failed"
                );
                stats.errors += 1;
            }
        }
    }

    stats
}

/// Runs poll sweeps forever, starting with one immediately.
///
/// Returns without looping when the poll path is not configured (no
/// tracker API key or no ready state id).
pub async fn run_poll_loop(state: AppState) {
    let config = state.config();
    if !config.poll_enabled() {
        info!("poll path disabled; relying on webhook deliveries only");
        return;
    }

    let tracker = match TrackerClient::new(config) {
        Ok(tracker) => tracker,
        Err(e) => {
            error!(error = %e, "could not build tracker client; poll path disabled");
            return;
        }
    };

    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = poll_once(&state, &tracker).await {
            warn!(error = %e, "poll sweep failed; retrying next interval");
        }
    }
}
