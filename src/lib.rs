//! Kickoff bot: turns "ready to start" tracker transitions into spawned
//! work, exactly once per transition.
//!
//! Two ingestion paths feed one pipeline. Webhook deliveries
//! ([`server::webhook`]) give low latency; a periodic poll sweep
//! ([`reconciler`]) catches anything the webhooks missed. Both normalize
//! their input ([`normalize`]) and funnel it through [`ingest`], where the
//! durable trigger ledger ([`ledger`]) is the sole dedup authority and,
//! for triggers that could not be dispatched directly ([`dispatch`]), the
//! fallback queue.

pub mod config;
pub mod dispatch;
pub mod ingest;
pub mod ledger;
pub mod normalize;
pub mod reconciler;
pub mod server;
pub mod status;
pub mod tracker;
pub mod types;
pub mod webhooks;
