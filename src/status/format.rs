//! Counting and rendering of ledger status.

use std::fmt;

use serde::Serialize;

use crate::ledger::{TriggerRecord, TriggerStatus};

/// Per-status record counts over the whole ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub pending: usize,
    pub spawned: usize,
    pub skipped: usize,
}

impl fmt::Display for LedgerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pending, {} spawned, {} skipped",
            self.pending, self.spawned, self.skipped
        )
    }
}

/// Counts records by status.
pub fn summarize(records: &[TriggerRecord]) -> LedgerSummary {
    let mut summary = LedgerSummary::default();
    for record in records {
        match record.status {
            TriggerStatus::Pending => summary.pending += 1,
            TriggerStatus::Spawned => summary.spawned += 1,
            TriggerStatus::Skipped => summary.skipped += 1,
        }
    }
    summary
}
