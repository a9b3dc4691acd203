//! Durable trigger ledger: dedup authority and fallback queue in one file.
//!
//! Both ingestion paths funnel into [`TriggerLedger::admit`]; any record it
//! writes stays `pending` until dispatch succeeds or an operator skips it.

pub mod log;
pub mod record;

pub use log::{Admission, LedgerError, TriggerLedger};
pub use record::{TriggerRecord, TriggerSource, TriggerStatus};
