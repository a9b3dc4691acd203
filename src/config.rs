//! Runtime configuration from environment variables.
//!
//! All settings use the `KICKOFF_` prefix. Absent values degrade to safe
//! defaults rather than failing startup:
//!
//! - no `KICKOFF_WEBHOOK_SECRET`: signature verification fails closed, so
//!   the push path is effectively disabled
//! - no `KICKOFF_TRACKER_API_KEY`: the poll path is disabled
//! - no `KICKOFF_TEAM_KEY`: the team filter is off (all teams pass)
//! - no `KICKOFF_SPAWNER_URL`: direct dispatch is skipped and admitted
//!   records stay `pending` for out-of-band draining

use std::path::PathBuf;
use std::time::Duration;

use crate::types::StateId;

/// Default poll interval (10 minutes).
const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;

/// Default number of recently-updated items fetched per poll sweep.
const DEFAULT_POLL_LIMIT: usize = 25;

/// Default timeout for a single dispatch attempt.
const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 30;

/// Default timeout for tracker API requests.
const DEFAULT_TRACKER_TIMEOUT_SECS: u64 = 15;

/// Default document root segment searched for in item descriptions.
const DEFAULT_DOC_ROOT: &str = "docs/";

/// Default document extension searched for in item descriptions.
const DEFAULT_DOC_EXT: &str = ".md";

/// Runtime configuration for the bot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for webhook signature verification. May be empty,
    /// in which case every push delivery is rejected (fail closed).
    pub webhook_secret: Vec<u8>,

    /// The tracker state id whose entry triggers work-spawning.
    pub ready_state_id: StateId,

    /// Optional team filter; compared against the work item id's prefix.
    pub team_key: Option<String>,

    /// Path to the NDJSON trigger ledger file.
    pub ledger_path: PathBuf,

    /// Root segment a document path must start with (e.g. `docs/`).
    pub doc_root: String,

    /// Extension a document path must end with (e.g. `.md`).
    pub doc_ext: String,

    /// When set, dispatch is not attempted and every admission is
    /// immediately recorded as spawned.
    pub dry_run: bool,

    /// Interval between poll sweeps.
    pub poll_interval: Duration,

    /// Maximum items fetched per poll sweep.
    pub poll_limit: usize,

    /// Timeout for a single direct-dispatch attempt.
    pub dispatch_timeout: Duration,

    /// Timeout for tracker API requests.
    pub tracker_timeout: Duration,

    /// Tracker query API endpoint.
    pub tracker_api_url: String,

    /// Tracker API key. Empty disables the poll path.
    pub tracker_api_key: String,

    /// Execution subsystem endpoint for direct dispatch. Absent means no
    /// spawner is wired and admitted records stay pending.
    pub spawner_url: Option<String>,
}

impl Config {
    /// Builds a configuration from environment variables.
    ///
    /// Every variable is optional; see the module docs for the degradation
    /// behavior of absent values.
    pub fn from_env() -> Self {
        let poll_mins = env_parse("KICKOFF_POLL_INTERVAL_MINS")
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS / 60);

        Config {
            webhook_secret: std::env::var("KICKOFF_WEBHOOK_SECRET")
                .map(String::into_bytes)
                .unwrap_or_default(),
            ready_state_id: StateId::new(
                std::env::var("KICKOFF_READY_STATE_ID").unwrap_or_default(),
            ),
            team_key: std::env::var("KICKOFF_TEAM_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            ledger_path: std::env::var("KICKOFF_LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("state/triggers.ndjson")),
            doc_root: std::env::var("KICKOFF_DOC_ROOT")
                .unwrap_or_else(|_| DEFAULT_DOC_ROOT.to_string()),
            doc_ext: std::env::var("KICKOFF_DOC_EXT")
                .unwrap_or_else(|_| DEFAULT_DOC_EXT.to_string()),
            dry_run: std::env::var("KICKOFF_DRY_RUN")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            poll_interval: Duration::from_secs(poll_mins * 60),
            poll_limit: env_parse("KICKOFF_POLL_LIMIT").unwrap_or(DEFAULT_POLL_LIMIT),
            dispatch_timeout: Duration::from_secs(
                env_parse("KICKOFF_DISPATCH_TIMEOUT_SECS")
                    .unwrap_or(DEFAULT_DISPATCH_TIMEOUT_SECS),
            ),
            tracker_timeout: Duration::from_secs(DEFAULT_TRACKER_TIMEOUT_SECS),
            tracker_api_url: std::env::var("KICKOFF_TRACKER_API_URL")
                .unwrap_or_else(|_| "https://api.linear.app/graphql".to_string()),
            tracker_api_key: std::env::var("KICKOFF_TRACKER_API_KEY").unwrap_or_default(),
            spawner_url: std::env::var("KICKOFF_SPAWNER_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    /// Returns true if the poll path has the credentials it needs.
    pub fn poll_enabled(&self) -> bool {
        !self.tracker_api_key.is_empty() && !self.ready_state_id.as_str().is_empty()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
impl Config {
    /// A configuration suitable for tests: no env access, tight timeouts.
    pub fn for_tests(ledger_path: impl Into<PathBuf>) -> Self {
        Config {
            webhook_secret: b"test-secret".to_vec(),
            ready_state_id: StateId::new("ready-state"),
            team_key: None,
            ledger_path: ledger_path.into(),
            doc_root: DEFAULT_DOC_ROOT.to_string(),
            doc_ext: DEFAULT_DOC_EXT.to_string(),
            dry_run: false,
            poll_interval: Duration::from_secs(60),
            poll_limit: DEFAULT_POLL_LIMIT,
            dispatch_timeout: Duration::from_secs(5),
            tracker_timeout: Duration::from_secs(5),
            tracker_api_url: "http://localhost:0/graphql".to_string(),
            tracker_api_key: String::new(),
            spawner_url: None,
        }
    }
}
