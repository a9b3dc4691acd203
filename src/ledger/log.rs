//! The trigger ledger: an append-only NDJSON file that is the sole
//! authority for dedup and trigger status.
//!
//! # Format
//!
//! One JSON object per line ([`TriggerRecord`]). Complete lines are always
//! valid JSON; a partial line from a crash mid-write is skipped on load
//! without discarding the rest of the file.
//!
//! # Write discipline
//!
//! - Admission re-reads the whole file, re-evaluates the dedup predicate,
//!   then appends a single line and fsyncs. The read-check-append sequence
//!   must be serialized by the caller; [`crate::server::AppState`] wraps
//!   the ledger in a `tokio::sync::Mutex` for this reason.
//! - Status transitions (`mark_spawned`, `mark_skipped`) rewrite the whole
//!   file through a temp file + atomic rename + directory fsync. There is
//!   no partial in-place mutation.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::normalize::TriggerCandidate;
use crate::types::WorkItemId;

use super::record::{TriggerRecord, TriggerSource, TriggerStatus};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error while writing a record.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// No active record existed; a new `pending` record was written.
    Admitted(TriggerRecord),

    /// An active record already covers this work item; nothing written.
    AlreadyActive(TriggerStatus),
}

impl Admission {
    /// True if a record was written.
    pub fn was_written(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

/// Handle to the ledger file.
///
/// The handle is path-based: every operation opens the file fresh, so the
/// on-disk log is the only authoritative copy and there is no in-memory
/// state to diverge from it.
#[derive(Debug)]
pub struct TriggerLedger {
    path: PathBuf,
}

impl TriggerLedger {
    /// Creates a handle. The file itself is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TriggerLedger { path: path.into() }
    }

    /// Returns the ledger file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all parseable records, in file order.
    ///
    /// Malformed lines are skipped with a debug log line: the file may be
    /// appended concurrently with this read, so a torn final line is
    /// expected and must not poison the valid prefix. A missing file is an
    /// empty ledger.
    pub fn load(&self) -> Result<Vec<TriggerRecord>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        // Lines are split as raw bytes: a crash can tear a multi-byte
        // UTF-8 character mid-write, and such a line must be skipped like
        // any other malformed line, not fail the whole load.
        let mut records = Vec::new();
        for (lineno, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_slice::<TriggerRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(line = lineno + 1, error = %e, "skipping malformed ledger line");
                }
            }
        }
        Ok(records)
    }

    /// Admission check plus append: writes one `pending` record iff no
    /// active record exists for the candidate's work item.
    ///
    /// The full ledger is re-read immediately before the append; callers
    /// serialize calls to this method (see module docs).
    pub fn admit(
        &self,
        candidate: &TriggerCandidate,
        source: TriggerSource,
    ) -> Result<Admission> {
        let existing = self.load()?;
        if let Some(active) = existing
            .iter()
            .find(|r| r.is_active() && r.work_item_id == candidate.work_item)
        {
            return Ok(Admission::AlreadyActive(active.status));
        }

        let record = TriggerRecord {
            work_item_id: candidate.work_item.clone(),
            title: candidate.title.clone(),
            target_state_id: candidate.state_id.clone(),
            triggered_at: Utc::now(),
            source,
            status: TriggerStatus::Pending,
            auxiliary_path: candidate.doc_path.clone(),
        };

        self.append(&record)?;
        Ok(Admission::Admitted(record))
    }

    /// Records dispatch completion: `pending → spawned`.
    ///
    /// Returns `true` if a record transitioned, `false` when no pending
    /// record exists for the work item.
    pub fn mark_spawned(&self, work_item: &WorkItemId) -> Result<bool> {
        self.transition(work_item, TriggerStatus::Spawned, |r| {
            r.status == TriggerStatus::Pending
        })
    }

    /// Out-of-band abandonment: `pending|spawned → skipped`, re-arming the
    /// work item for a fresh admission on its next sighting.
    pub fn mark_skipped(&self, work_item: &WorkItemId) -> Result<bool> {
        self.transition(work_item, TriggerStatus::Skipped, TriggerRecord::is_active)
    }

    /// Appends one record as a single line, creating the file and its
    /// parent directories on first write.
    fn append(&self, record: &TriggerRecord) -> Result<()> {
        let created = !self.path.exists();
        if created && let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)?;
        file.sync_all()?;

        // A freshly created file also needs its directory entry persisted.
        if created && let Some(parent) = self.path.parent() {
            fsync_dir(parent)?;
        }
        Ok(())
    }

    /// Rewrites the file with the first eligible record for `work_item`
    /// moved to `to`. The rewrite goes through a temp file and an atomic
    /// rename so readers never observe a half-written ledger.
    fn transition(
        &self,
        work_item: &WorkItemId,
        to: TriggerStatus,
        eligible: impl Fn(&TriggerRecord) -> bool,
    ) -> Result<bool> {
        let mut records = self.load()?;

        let Some(record) = records
            .iter_mut()
            .find(|r| r.work_item_id == *work_item && eligible(r))
        else {
            return Ok(false);
        };
        record.status = to;

        let tmp_path = self.path.with_extension("ndjson.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for record in &records {
                let json = serde_json::to_string(record)?;
                writeln!(tmp, "{}", json)?;
            }
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        if let Some(parent) = self.path.parent() {
            fsync_dir(parent)?;
        }
        Ok(true)
    }
}

/// Persists a directory entry. Without this, a rename or file creation may
/// not survive a power loss even when the file contents were synced.
fn fsync_dir(dir: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir)?;
    dir.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StateId;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn candidate(id: &str) -> TriggerCandidate {
        TriggerCandidate {
            work_item: WorkItemId::new(id),
            title: format!("task {}", id),
            state_id: StateId::new("ready-state"),
            doc_path: None,
        }
    }

    #[test]
    fn first_admission_writes_pending() {
        let dir = tempdir().unwrap();
        let ledger = TriggerLedger::new(dir.path().join("triggers.ndjson"));

        let admission = ledger
            .admit(&candidate("CRU-123"), TriggerSource::Webhook)
            .unwrap();
        assert!(admission.was_written());

        let records = ledger.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].work_item_id.as_str(), "CRU-123");
        assert_eq!(records[0].status, TriggerStatus::Pending);
        assert_eq!(records[0].source, TriggerSource::Webhook);
    }

    #[test]
    fn second_admission_is_rejected_whatever_the_source() {
        let dir = tempdir().unwrap();
        let ledger = TriggerLedger::new(dir.path().join("triggers.ndjson"));

        ledger
            .admit(&candidate("CRU-123"), TriggerSource::Webhook)
            .unwrap();

        // Webhook retry
        let retry = ledger
            .admit(&candidate("CRU-123"), TriggerSource::Webhook)
            .unwrap();
        assert_eq!(retry, Admission::AlreadyActive(TriggerStatus::Pending));

        // Poll sweep observing the same still-ready state
        let poll = ledger
            .admit(&candidate("CRU-123"), TriggerSource::Poll)
            .unwrap();
        assert!(!poll.was_written());

        assert_eq!(ledger.load().unwrap().len(), 1);
    }

    #[test]
    fn spawned_record_still_blocks_admission() {
        let dir = tempdir().unwrap();
        let ledger = TriggerLedger::new(dir.path().join("triggers.ndjson"));

        ledger
            .admit(&candidate("CRU-123"), TriggerSource::Poll)
            .unwrap();
        assert!(ledger.mark_spawned(&WorkItemId::new("CRU-123")).unwrap());

        let again = ledger
            .admit(&candidate("CRU-123"), TriggerSource::Webhook)
            .unwrap();
        assert_eq!(again, Admission::AlreadyActive(TriggerStatus::Spawned));
    }

    #[test]
    fn skipped_record_re_arms_the_work_item() {
        let dir = tempdir().unwrap();
        let ledger = TriggerLedger::new(dir.path().join("triggers.ndjson"));
        let id = WorkItemId::new("CRU-123");

        ledger
            .admit(&candidate("CRU-123"), TriggerSource::Webhook)
            .unwrap();
        assert!(ledger.mark_skipped(&id).unwrap());

        let again = ledger
            .admit(&candidate("CRU-123"), TriggerSource::Poll)
            .unwrap();
        assert!(again.was_written());

        // Both the old skipped record and the new pending one are retained.
        let records = ledger.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, TriggerStatus::Skipped);
        assert_eq!(records[1].status, TriggerStatus::Pending);
        assert_eq!(records[1].source, TriggerSource::Poll);
    }

    #[test]
    fn mark_spawned_requires_a_pending_record() {
        let dir = tempdir().unwrap();
        let ledger = TriggerLedger::new(dir.path().join("triggers.ndjson"));
        let id = WorkItemId::new("CRU-9");

        // Nothing in the ledger
        assert!(!ledger.mark_spawned(&id).unwrap());

        // Skipped records are not eligible
        ledger.admit(&candidate("CRU-9"), TriggerSource::Poll).unwrap();
        ledger.mark_skipped(&id).unwrap();
        assert!(!ledger.mark_spawned(&id).unwrap());
    }

    #[test]
    fn mark_skipped_works_from_spawned() {
        let dir = tempdir().unwrap();
        let ledger = TriggerLedger::new(dir.path().join("triggers.ndjson"));
        let id = WorkItemId::new("CRU-9");

        ledger.admit(&candidate("CRU-9"), TriggerSource::Poll).unwrap();
        assert!(ledger.mark_spawned(&id).unwrap());
        assert!(ledger.mark_skipped(&id).unwrap());

        let records = ledger.load().unwrap();
        assert_eq!(records[0].status, TriggerStatus::Skipped);
    }

    #[test]
    fn load_tolerates_malformed_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("triggers.ndjson");
        let ledger = TriggerLedger::new(&path);

        ledger
            .admit(&candidate("CRU-1"), TriggerSource::Webhook)
            .unwrap();

        // Corrupt line in the middle (e.g. crash mid-write plus a later append)
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{\"workItemId\":\"CRU-2\",\"titl").unwrap();
        drop(file);

        ledger
            .admit(&candidate("CRU-3"), TriggerSource::Poll)
            .unwrap();

        let records = ledger.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].work_item_id.as_str(), "CRU-1");
        assert_eq!(records[1].work_item_id.as_str(), "CRU-3");
    }

    #[test]
    fn load_tolerates_non_utf8_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("triggers.ndjson");
        let ledger = TriggerLedger::new(&path);

        ledger
            .admit(&candidate("CRU-1"), TriggerSource::Webhook)
            .unwrap();

        // A torn multi-byte character from a crash mid-write leaves bytes
        // that are not valid UTF-8 at all.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0xff, 0xfe, 0x80, b'\n']).unwrap();
        drop(file);

        ledger
            .admit(&candidate("CRU-2"), TriggerSource::Poll)
            .unwrap();

        let records = ledger.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].work_item_id.as_str(), "CRU-1");
        assert_eq!(records[1].work_item_id.as_str(), "CRU-2");
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let ledger = TriggerLedger::new(dir.path().join("nope").join("triggers.ndjson"));
        assert!(ledger.load().unwrap().is_empty());
    }

    #[test]
    fn append_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("triggers.ndjson");
        let ledger = TriggerLedger::new(&path);

        ledger
            .admit(&candidate("CRU-1"), TriggerSource::Webhook)
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn transition_preserves_unrelated_records() {
        let dir = tempdir().unwrap();
        let ledger = TriggerLedger::new(dir.path().join("triggers.ndjson"));

        ledger.admit(&candidate("CRU-1"), TriggerSource::Webhook).unwrap();
        ledger.admit(&candidate("CRU-2"), TriggerSource::Poll).unwrap();
        ledger.mark_spawned(&WorkItemId::new("CRU-1")).unwrap();

        let records = ledger.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, TriggerStatus::Spawned);
        assert_eq!(records[1].status, TriggerStatus::Pending);
    }

    proptest! {
        /// Whatever the interleaving of admissions, spawns, and skips, no
        /// work item ever has more than one active record.
        #[test]
        fn at_most_one_active_record_per_item(
            ops in prop::collection::vec((0u8..4, 0usize..4), 1..30)
        ) {
            let dir = tempdir().unwrap();
            let ledger = TriggerLedger::new(dir.path().join("triggers.ndjson"));
            let ids = ["CRU-1", "CRU-2", "CRU-3", "CRU-4"];

            for (op, which) in ops {
                let id = WorkItemId::new(ids[which]);
                match op {
                    0 => { ledger.admit(&candidate(ids[which]), TriggerSource::Webhook).unwrap(); }
                    1 => { ledger.admit(&candidate(ids[which]), TriggerSource::Poll).unwrap(); }
                    2 => { ledger.mark_spawned(&id).unwrap(); }
                    _ => { ledger.mark_skipped(&id).unwrap(); }
                }

                let mut active: HashMap<String, usize> = HashMap::new();
                for record in ledger.load().unwrap() {
                    if record.is_active() {
                        *active.entry(record.work_item_id.as_str().to_string()).or_default() += 1;
                    }
                }
                for (id, count) in active {
                    prop_assert!(count <= 1, "{} has {} active records", id, count);
                }
            }
        }

        /// Records survive a load/rewrite cycle byte-exactly in content.
        #[test]
        fn transitions_never_lose_records(n in 1usize..10) {
            let dir = tempdir().unwrap();
            let ledger = TriggerLedger::new(dir.path().join("triggers.ndjson"));

            for i in 0..n {
                ledger.admit(&candidate(&format!("CRU-{}", i)), TriggerSource::Poll).unwrap();
            }
            ledger.mark_spawned(&WorkItemId::new("CRU-0")).unwrap();

            let records = ledger.load().unwrap();
            prop_assert_eq!(records.len(), n);
        }
    }
}
