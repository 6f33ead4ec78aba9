//! Relay log retrieval.
//!
//! # Responsibilities
//! - Fetch the relay's recent log lines from whichever source is available
//! - Present them newest line first
//!
//! # Design Decisions
//! - Never fails; every failure becomes a placeholder text for the operator
//! - The relay's own `/logs` endpoint is trusted to return newest first;
//!   container and CLI output is oldest first and gets reversed

use std::sync::Arc;

use crate::config::settings::{ConsoleSettings, EnvironmentMode};
use crate::lifecycle::resolve_container;
use crate::lifecycle::types::{ContainerRuntime, LifecycleError, Supervisor};
use crate::probe::RelayClient;

pub const NO_LOGS: &str = "[No logs available yet; the relay may still be starting]";

/// Reverse log text so the newest line comes first. Trailing blank lines
/// are dropped so they never end up on top.
pub fn newest_first(text: &str) -> String {
    text.trim_end().lines().rev().collect::<Vec<_>>().join("\n")
}

/// Fetches recent relay logs according to the environment mode.
pub struct LogRetriever {
    mode: EnvironmentMode,
    relay: RelayClient,
    runtime: Arc<dyn ContainerRuntime>,
    supervisor: Arc<dyn Supervisor>,
    candidates: Vec<String>,
    service: String,
}

impl LogRetriever {
    pub fn new(
        settings: &ConsoleSettings,
        relay: RelayClient,
        runtime: Arc<dyn ContainerRuntime>,
        supervisor: Arc<dyn Supervisor>,
    ) -> Self {
        Self {
            mode: settings.mode,
            relay,
            runtime,
            supervisor,
            candidates: settings.container_candidates(),
            service: settings.compose_service.clone(),
        }
    }

    /// Last `lines` log lines, newest first, or a placeholder message.
    pub async fn fetch(&self, lines: u32) -> String {
        let text = match self.mode {
            EnvironmentMode::Managed => return self.from_relay(lines).await,
            EnvironmentMode::Direct => self.from_runtime(lines).await,
        };
        match text {
            Ok(text) if text.trim().is_empty() => NO_LOGS.to_string(),
            Ok(text) => newest_first(&text),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch relay logs");
                format!("Failed to fetch logs: {}", e)
            }
        }
    }

    async fn from_relay(&self, lines: u32) -> String {
        match self.relay.fetch_logs(lines).await {
            Ok(logs) if logs.is_empty() => NO_LOGS.to_string(),
            Ok(logs) => logs.join("\n"),
            Err(e) if e.is_unreachable() => format!(
                "Connection error: cannot reach the relay at {}. Check that the service is running.\n({})",
                self.relay.base_url(),
                e
            ),
            Err(e) => format!(
                "Failed to fetch logs from the relay API: {}. Use the hosting platform's log view instead.",
                e
            ),
        }
    }

    async fn from_runtime(&self, lines: u32) -> Result<String, LifecycleError> {
        match resolve_container(self.runtime.as_ref(), &self.candidates).await {
            Ok(container) => self.runtime.logs(&container, lines).await,
            Err(e) => {
                tracing::info!(reason = %e, service = %self.service, "Reading logs via CLI");
                self.supervisor.tail_logs(&self.service, lines).await
            }
        }
    }
}
