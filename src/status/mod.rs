//! Ledger status summaries for the inspection endpoint and poll logging.

pub mod format;

pub use format::{LedgerSummary, summarize};
