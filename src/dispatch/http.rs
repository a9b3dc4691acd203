//! HTTP-backed [`WorkSpawner`] implementation.
//!
//! Posts the spawn request as JSON to the configured execution subsystem
//! endpoint. Any non-2xx answer or transport failure maps to a
//! [`SpawnError`]; the caller's timeout bounds the whole attempt.

use async_trait::async_trait;
use std::time::Duration;

use super::{SpawnError, SpawnRequest, WorkSpawner};

/// Spawner that hands requests to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpSpawner {
    http: reqwest::Client,
    url: String,
}

impl HttpSpawner {
    /// Builds a spawner posting to `url` with the given request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SpawnError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpawnError::Unavailable(e.to_string()))?;

        Ok(HttpSpawner {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl WorkSpawner for HttpSpawner {
    async fn spawn(&self, request: &SpawnRequest) -> Result<(), SpawnError> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| SpawnError::Unavailable(e.to_string()))?;

        if let Err(e) = response.error_for_status() {
            return Err(SpawnError::Failed(e.to_string()));
        }
        Ok(())
    }
}
