//! HTTP surface of the bot.
//!
//! - `POST /webhook` - accepts tracker push deliveries. A valid signature
//!   earns an immediate 200; processing continues in the background.
//! - `GET /api/v1/triggers` - returns the trigger ledger with a per-status
//!   summary, for observability.
//! - `POST /api/v1/triggers/{id}/skip` - abandons the active trigger for a
//!   work item, re-arming it for future admissions.
//! - `GET /health` - liveness probe.
//!
//! Unsupported methods on these routes answer 405 via axum's method
//! routing; no handler sees them.

use std::sync::Arc;

use tokio::sync::Mutex;

pub mod health;
pub mod triggers;
pub mod webhook;

pub use health::health_handler;
pub use triggers::{list_triggers_handler, skip_trigger_handler};
pub use webhook::webhook_handler;

use crate::config::Config;
use crate::dispatch::WorkSpawner;
use crate::ledger::TriggerLedger;

/// Shared application state, passed to handlers via axum's `State`
/// extractor and to the poll loop.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,

    /// The mutex serializes the ledger's read-check-append admission
    /// sequence across the webhook and poll paths.
    ledger: Mutex<TriggerLedger>,

    /// Execution subsystem, when one is configured.
    spawner: Option<Arc<dyn WorkSpawner>>,
}

impl AppState {
    /// Creates the shared state; the ledger handle points at the
    /// configured path.
    pub fn new(config: Config, spawner: Option<Arc<dyn WorkSpawner>>) -> Self {
        let ledger = Mutex::new(TriggerLedger::new(&config.ledger_path));
        AppState {
            inner: Arc::new(AppStateInner {
                config,
                ledger,
                spawner,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn ledger(&self) -> &Mutex<TriggerLedger> {
        &self.inner.ledger
    }

    pub fn spawner(&self) -> Option<&dyn WorkSpawner> {
        self.inner.spawner.as_deref()
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/api/v1/triggers", get(list_triggers_handler))
        .route("/api/v1/triggers/{id}/skip", post(skip_trigger_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
