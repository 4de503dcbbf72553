use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::error::ApiError;
use super::sse::StreamDriver;
use super::{EventStream, OpsApi};
use crate::proto::{Range, SnapshotDoc};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            reconnect_initial: Duration::from_millis(500),
            reconnect_max: Duration::from_secs(30),
        }
    }
}

/// Client for the ops snapshot and event-stream endpoints
pub struct OpsClient {
    http: reqwest::Client,
    base_url: String,
    config: ClientConfig,
}

impl OpsClient {
    /// Create a new client for `base_url` (scheme + host, no trailing slash
    /// required).
    ///
    /// The request timeout applies per snapshot request only; the streaming
    /// connection must be allowed to stay open indefinitely.
    pub fn new(base_url: impl Into<String>, config: ClientConfig) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/').to_string();
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ApiError::BaseUrl(base_url));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: trimmed,
            config,
        })
    }

    fn snapshot_url(&self, range: Range) -> String {
        format!("{}/api/ops/state?range={}", self.base_url, range)
    }

    fn events_url(&self, range: Range) -> String {
        format!("{}/api/ops/events?range={}", self.base_url, range)
    }
}

#[async_trait]
impl OpsApi for OpsClient {
    async fn fetch_snapshot(&self, range: Range) -> Result<SnapshotDoc, ApiError> {
        let url = self.snapshot_url(range);
        debug!(%url, "fetching ops snapshot");

        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    fn subscribe(&self, range: Range) -> EventStream {
        StreamDriver::new(
            self.http.clone(),
            self.events_url(range),
            self.config.reconnect_initial,
            self.config.reconnect_max,
        )
        .into_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_base_url() {
        assert!(matches!(
            OpsClient::new("localhost:8080", ClientConfig::default()),
            Err(ApiError::BaseUrl(_))
        ));
    }

    #[test]
    fn test_urls_include_range() {
        let client = OpsClient::new("http://127.0.0.1:9000/", ClientConfig::default()).unwrap();
        assert_eq!(
            client.snapshot_url(Range::D7),
            "http://127.0.0.1:9000/api/ops/state?range=7d"
        );
        assert_eq!(
            client.events_url(Range::H24),
            "http://127.0.0.1:9000/api/ops/events?range=24h"
        );
    }
}
