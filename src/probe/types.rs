//! Relay API types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Response of the relay's `/health` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthSnapshot {
    pub ws_connected: bool,
    pub total_coins: u64,
    pub total_batches: u64,
    pub uptime_seconds: u64,
    pub reconnect_count: u64,
    pub last_message_ago: Option<u64>,
    pub n8n_available: bool,
    pub last_error: Option<String>,
    pub last_coin_ago: Option<u64>,
}

impl HealthSnapshot {
    /// Uptime as `"{h}h {m}m"`.
    pub fn uptime_display(&self) -> String {
        let hours = self.uptime_seconds / 3600;
        let minutes = (self.uptime_seconds % 3600) / 60;
        format!("{}h {}m", hours, minutes)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReloadResponse {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<String>,
}

/// Errors talking to the relay. Always non-fatal to the console.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The relay host could not be reached (refused, DNS, no route).
    #[error("cannot reach relay service at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The call exceeded its deadline.
    #[error("request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The relay answered with something other than 200.
    #[error("HTTP {status}")]
    Status { status: u16 },

    /// The body could not be read or decoded.
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Any other transport failure.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ProbeError {
    /// Classify a transport error from reqwest.
    pub(crate) fn from_transport(url: &str, secs: u64, source: reqwest::Error) -> Self {
        let url = url.to_string();
        if source.is_timeout() {
            ProbeError::Timeout { url, secs }
        } else if source.is_connect() {
            ProbeError::Unreachable { url, source }
        } else if source.is_decode() || source.is_body() {
            ProbeError::Decode { url, source }
        } else {
            ProbeError::Request { url, source }
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, ProbeError::Unreachable { .. })
    }
}

/// Result type for relay API calls.
pub type ProbeResult<T> = Result<T, ProbeError>;
