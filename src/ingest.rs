//! The shared ingestion pipeline both paths funnel through.
//!
//! Push and poll converge here after normalization: admission under the
//! ledger lock, dispatch outside it, then the completion transition iff
//! dispatch was acknowledged. Crash-ordering matters: the record is
//! durably `pending` before any dispatch attempt, so a crash between
//! admission and dispatch leaves a recoverable record, never a lost event.

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::dispatch::{DispatchOutcome, WorkSpawner, dispatch_trigger};
use crate::ledger::{Admission, LedgerError, TriggerLedger, TriggerSource, TriggerStatus};
use crate::normalize::TriggerCandidate;

/// What happened to one normalized candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// An active record already covered the work item; nothing written.
    Duplicate(TriggerStatus),

    /// Admitted; direct dispatch did not complete, record left `pending`.
    Pending,

    /// Admitted and dispatched; record is `spawned`.
    Spawned,
}

/// Runs one candidate through admission, dispatch, and status update.
///
/// The ledger mutex serializes the read-check-append sequence; dispatch
/// runs outside the lock so a slow execution subsystem never blocks other
/// admissions.
pub async fn process_candidate(
    ledger: &Mutex<TriggerLedger>,
    spawner: Option<&dyn WorkSpawner>,
    config: &Config,
    candidate: TriggerCandidate,
    source: TriggerSource,
) -> Result<IngestOutcome, LedgerError> {
    let admission = {
        let ledger = ledger.lock().await;
        ledger.admit(&candidate, source)?
    };

    let record = match admission {
        Admission::AlreadyActive(status) => {
            debug!(
                work_item = %candidate.work_item,
                existing_status = ?status,
                "already actioned; nothing written"
            );
            return Ok(IngestOutcome::Duplicate(status));
        }
        Admission::Admitted(record) => {
            info!(
                work_item = %record.work_item_id,
                source = ?source,
                "admitted ready transition"
            );
            record
        }
    };

    match dispatch_trigger(spawner, &record, config).await {
        DispatchOutcome::Delivered => {
            let ledger = ledger.lock().await;
            if !ledger.mark_spawned(&record.work_item_id)? {
                // An operator skipped the record between admission and
                // completion; the dispatch already happened, so just log.
                error!(
                    work_item = %record.work_item_id,
                    "pending record vanished before completion transition"
                );
            }
            Ok(IngestOutcome::Spawned)
        }
        DispatchOutcome::NotDelivered => Ok(IngestOutcome::Pending),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{SpawnError, SpawnRequest};
    use crate::types::{StateId, WorkItemId};
    use async_trait::async_trait;
    use tempfile::tempdir;

    fn candidate(id: &str) -> TriggerCandidate {
        TriggerCandidate {
            work_item: WorkItemId::new(id),
            title: "a task".to_string(),
            state_id: StateId::new("ready-state"),
            doc_path: None,
        }
    }

    struct OkSpawner;

    #[async_trait]
    impl WorkSpawner for OkSpawner {
        async fn spawn(&self, _request: &SpawnRequest) -> Result<(), SpawnError> {
            Ok(())
        }
    }

    struct DownSpawner;

    #[async_trait]
    impl WorkSpawner for DownSpawner {
        async fn spawn(&self, _request: &SpawnRequest) -> Result<(), SpawnError> {
            Err(SpawnError::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn admitted_and_dispatched_ends_spawned() {
        let dir = tempdir().unwrap();
        let config = Config::for_tests(dir.path().join("triggers.ndjson"));
        let ledger = Mutex::new(TriggerLedger::new(&config.ledger_path));

        let outcome = process_candidate(
            &ledger,
            Some(&OkSpawner),
            &config,
            candidate("CRU-1"),
            TriggerSource::Webhook,
        )
        .await
        .unwrap();

        assert_eq!(outcome, IngestOutcome::Spawned);
        let records = ledger.lock().await.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TriggerStatus::Spawned);
    }

    #[tokio::test]
    async fn dispatch_failure_leaves_pending() {
        let dir = tempdir().unwrap();
        let config = Config::for_tests(dir.path().join("triggers.ndjson"));
        let ledger = Mutex::new(TriggerLedger::new(&config.ledger_path));

        let outcome = process_candidate(
            &ledger,
            Some(&DownSpawner),
            &config,
            candidate("CRU-1"),
            TriggerSource::Poll,
        )
        .await
        .unwrap();

        assert_eq!(outcome, IngestOutcome::Pending);
        let records = ledger.lock().await.load().unwrap();
        assert_eq!(records[0].status, TriggerStatus::Pending);
    }

    #[tokio::test]
    async fn webhook_then_poll_admits_exactly_once() {
        let dir = tempdir().unwrap();
        let config = Config::for_tests(dir.path().join("triggers.ndjson"));
        let ledger = Mutex::new(TriggerLedger::new(&config.ledger_path));

        let first = process_candidate(
            &ledger,
            None,
            &config,
            candidate("CRU-1"),
            TriggerSource::Webhook,
        )
        .await
        .unwrap();
        assert_eq!(first, IngestOutcome::Pending);

        let second = process_candidate(
            &ledger,
            None,
            &config,
            candidate("CRU-1"),
            TriggerSource::Poll,
        )
        .await
        .unwrap();
        assert_eq!(second, IngestOutcome::Duplicate(TriggerStatus::Pending));

        assert_eq!(ledger.lock().await.load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_ingestion_of_the_same_item_admits_once() {
        let dir = tempdir().unwrap();
        let config = Config::for_tests(dir.path().join("triggers.ndjson"));
        let ledger = std::sync::Arc::new(Mutex::new(TriggerLedger::new(&config.ledger_path)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                process_candidate(
                    &ledger,
                    None,
                    &config,
                    candidate("CRU-1"),
                    TriggerSource::Webhook,
                )
                .await
                .unwrap()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() == IngestOutcome::Pending {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(ledger.lock().await.load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_failure_does_not_block_other_items() {
        let dir = tempdir().unwrap();
        let config = Config::for_tests(dir.path().join("triggers.ndjson"));
        let ledger = Mutex::new(TriggerLedger::new(&config.ledger_path));

        // CRU-1 dispatch fails, CRU-2 still processes normally.
        process_candidate(&ledger, Some(&DownSpawner), &config, candidate("CRU-1"), TriggerSource::Webhook)
            .await
            .unwrap();
        let outcome = process_candidate(&ledger, Some(&OkSpawner), &config, candidate("CRU-2"), TriggerSource::Webhook)
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::Spawned);
        assert_eq!(ledger.lock().await.load().unwrap().len(), 2);
    }
}
