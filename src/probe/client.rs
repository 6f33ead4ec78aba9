//! Relay HTTP API client with timeout and error handling.
//!
//! # Responsibilities
//! - Fetch health and metrics for the dashboard
//! - Ask the relay to reload its configuration in place
//! - Fetch recent log lines when no container access exists
//!
//! # Design Decisions
//! - Every call carries its own deadline (2s probes, 5s reload and logs)
//! - Only HTTP 200 counts as success
//! - Errors are values; an unreachable relay is a display state, not a crash

use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::config::settings::{ConsoleSettings, TimeoutSettings};
use crate::probe::types::{HealthSnapshot, LogsResponse, ProbeError, ProbeResult, ReloadResponse};

const DEFAULT_RELOAD_MESSAGE: &str = "Configuration reloaded";

/// Client for the relay's HTTP API.
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    base_url: String,
    timeouts: TimeoutSettings,
}

impl RelayClient {
    /// Create a client for the relay at `base_url` (e.g. `http://relay:8000`).
    pub fn new(base_url: impl Into<String>, timeouts: TimeoutSettings) -> ProbeResult<Self> {
        let client = Client::builder().no_proxy().build().map_err(ProbeError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeouts,
        })
    }

    pub fn from_settings(settings: &ConsoleSettings) -> ProbeResult<Self> {
        Self::new(settings.relay_url(), settings.timeouts.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /health`.
    pub async fn get_health(&self) -> ProbeResult<HealthSnapshot> {
        let url = self.url("/health");
        let response = self.send(self.client.get(&url), &url, self.timeouts.health()).await?;
        let response = expect_ok(response)?;
        response
            .json()
            .await
            .map_err(|e| ProbeError::from_transport(&url, self.timeouts.health_secs, e))
    }

    /// `GET /metrics`, returning the raw exposition text.
    pub async fn get_metrics(&self) -> ProbeResult<String> {
        let url = self.url("/metrics");
        let response = self.send(self.client.get(&url), &url, self.timeouts.metrics()).await?;
        let response = expect_ok(response)?;
        response
            .text()
            .await
            .map_err(|e| ProbeError::from_transport(&url, self.timeouts.metrics_secs, e))
    }

    /// `POST /reload-config`. Returns the relay's message on success.
    pub async fn reload_config(&self) -> ProbeResult<String> {
        let url = self.url("/reload-config");
        let response = self.send(self.client.post(&url), &url, self.timeouts.reload()).await?;
        let response = expect_ok(response)?;

        // A 200 without a usable body is still a successful reload.
        let message = match response.json::<ReloadResponse>().await {
            Ok(body) => body.message,
            Err(e) => {
                tracing::debug!(error = %e, "Reload response had no JSON body");
                None
            }
        };
        let message = message.unwrap_or_else(|| DEFAULT_RELOAD_MESSAGE.to_string());

        tracing::info!(message = %message, "Relay reloaded its configuration");
        Ok(message)
    }

    /// `GET /logs?lines=N`, lines in the order the relay sent them.
    pub async fn fetch_logs(&self, lines: u32) -> ProbeResult<Vec<String>> {
        let url = self.url("/logs");
        let request = self.client.get(&url).query(&[("lines", lines)]);
        let response = self.send(request, &url, self.timeouts.logs()).await?;
        let response = expect_ok(response)?;
        let body: LogsResponse = response
            .json()
            .await
            .map_err(|e| ProbeError::from_transport(&url, self.timeouts.logs_secs, e))?;
        Ok(body.logs)
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str, timeout: Duration) -> ProbeResult<Response> {
        request.timeout(timeout).send().await.map_err(|e| {
            let err = ProbeError::from_transport(url, timeout.as_secs(), e);
            tracing::warn!(url = %url, error = %err, "Relay request failed");
            err
        })
    }
}

fn expect_ok(response: Response) -> ProbeResult<Response> {
    let status = response.status();
    if status == StatusCode::OK {
        Ok(response)
    } else {
        tracing::warn!(url = %response.url(), status = %status, "Relay returned non-success status");
        Err(ProbeError::Status { status: status.as_u16() })
    }
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
