//! Tracker query API client for the poll path.
//!
//! Webhooks are the primary trigger, but deliveries can be lost to network
//! issues or downtime. The poll path periodically asks the tracker for the
//! most recently updated work items and runs them through the same pipeline.
//!
//! The client speaks the tracker's GraphQL-style query endpoint and performs
//! exactly one operation: fetch a bounded list of recently-updated issues,
//! optionally scoped to a team. All requests carry a timeout; a timed-out or
//! failed request is a transient error the caller logs and retries on the
//! next sweep.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::Config;

/// Errors from the tracker query API.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Transport-level failure (connect, timeout, TLS, ...).
    #[error("tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered but reported errors instead of data.
    #[error("tracker API error: {0}")]
    Api(String),

    /// The response body did not have the expected shape.
    #[error("unexpected tracker response: {0}")]
    Shape(#[from] serde_json::Error),
}

/// One work item node from a poll-query result.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueNode {
    /// Human-readable id, e.g. `CRU-123`.
    pub identifier: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Current workflow state.
    pub state: IssueState,

    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Workflow state reference on an issue node.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueState {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,
}

/// A client for the tracker's query API.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl TrackerClient {
    /// Builds a client from configuration.
    ///
    /// The underlying HTTP client carries the configured request timeout,
    /// so no call through this client can block indefinitely.
    pub fn new(config: &Config) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .timeout(config.tracker_timeout)
            .build()?;

        Ok(TrackerClient {
            http,
            api_url: config.tracker_api_url.clone(),
            api_key: config.tracker_api_key.clone(),
        })
    }

    /// Fetches up to `limit` most-recently-updated issues, optionally
    /// scoped to a team key.
    pub async fn recently_updated(
        &self,
        team_key: Option<&str>,
        limit: usize,
    ) -> Result<Vec<IssueNode>, TrackerError> {
        let filter = match team_key {
            Some(key) => json!({ "team": { "key": { "eq": key } } }),
            None => json!({}),
        };

        let request = json!({
            "query": RECENTLY_UPDATED_QUERY,
            "variables": { "first": limit, "filter": filter },
        });

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", &self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: QueryResponse = response.json().await?;

        if let Some(errors) = body.errors
            && !errors.is_empty()
        {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(TrackerError::Api(messages.join("; ")));
        }

        Ok(body
            .data
            .map(|d| d.issues.nodes)
            .unwrap_or_default())
    }
}

/// The single query this bot issues.
const RECENTLY_UPDATED_QUERY: &str = "\
query RecentlyUpdated($first: Int!, $filter: IssueFilter) {
  issues(first: $first, filter: $filter, orderBy: updatedAt) {
    nodes {
      identifier
      title
      description
      state { id name }
      updatedAt
    }
  }
}";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Option<QueryData>,

    #[serde(default)]
    errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    issues: IssueConnection,
}

#[derive(Debug, Deserialize)]
struct IssueConnection {
    #[serde(default)]
    nodes: Vec<IssueNode>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
