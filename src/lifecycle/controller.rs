//! Reload-versus-restart state machine.
//!
//! # Responsibilities
//! - Make a saved configuration take effect on the relay
//! - Pick the strategy from the environment mode
//! - Always end in a terminal state with an operator-facing message
//!
//! # State Machine
//! ```text
//! Idle ─► Reloading ─► Reloaded | ReloadFailed          (any mode)
//! Idle ─► Restarting ─► Restarted | RestartFailed       (direct mode)
//! ```
//!
//! # Design Decisions
//! - Managed mode never falls back to container control
//! - Direct mode restarts the container so the relay re-reads its env file;
//!   the CLI is used only when the container API is unreachable
//! - No retries; a failed action is re-run by the operator

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::settings::{ConsoleSettings, EnvironmentMode};
use crate::lifecycle::resolve_container;
use crate::lifecycle::types::{ContainerInfo, ContainerRuntime, LifecycleResult, Supervisor};
use crate::probe::RelayClient;

/// Controller state. Every action ends in one of the terminal variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ControlState {
    Idle,
    Reloading,
    Reloaded(String),
    ReloadFailed(String),
    Restarting,
    Restarted(String),
    RestartFailed(String),
}

impl ControlState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ControlState::Idle | ControlState::Reloading | ControlState::Restarting)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ControlState::Reloaded(_) | ControlState::Restarted(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ControlState::Reloaded(m)
            | ControlState::ReloadFailed(m)
            | ControlState::Restarted(m)
            | ControlState::RestartFailed(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlState::Idle => f.write_str("idle"),
            ControlState::Reloading => f.write_str("reloading"),
            ControlState::Restarting => f.write_str("restarting"),
            ControlState::Reloaded(m) => write!(f, "reloaded: {}", m),
            ControlState::ReloadFailed(m) => write!(f, "reload failed: {}", m),
            ControlState::Restarted(m) => write!(f, "restarted: {}", m),
            ControlState::RestartFailed(m) => write!(f, "restart failed: {}", m),
        }
    }
}

/// Applies configuration changes to the relay.
pub struct ServiceController {
    mode: EnvironmentMode,
    relay: RelayClient,
    runtime: Arc<dyn ContainerRuntime>,
    supervisor: Arc<dyn Supervisor>,
    candidates: Vec<String>,
    service: String,
    stop_grace: Duration,
    state: ControlState,
}

impl ServiceController {
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
            stop_grace: settings.timeouts.stop_grace(),
            state: ControlState::Idle,
        }
    }

    pub fn mode(&self) -> EnvironmentMode {
        self.mode
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    fn transition(&mut self, next: ControlState) {
        if next.is_terminal() && !next.is_success() {
            tracing::warn!(from = %self.state, to = %next, "Controller state change");
        } else {
            tracing::info!(from = %self.state, to = %next, "Controller state change");
        }
        self.state = next;
    }

    /// Make the saved configuration take effect: reload in managed mode,
    /// restart in direct mode.
    pub async fn apply(&mut self) -> ControlState {
        match self.mode {
            EnvironmentMode::Managed => self.reload().await,
            EnvironmentMode::Direct => self.restart().await,
        }
    }

    /// Ask the relay to reload its configuration in place.
    pub async fn reload(&mut self) -> ControlState {
        self.transition(ControlState::Reloading);

        let next = match self.relay.reload_config().await {
            Ok(message) => ControlState::Reloaded(message),
            Err(e) if self.mode == EnvironmentMode::Managed => ControlState::ReloadFailed(format!(
                "Reload failed: {}. Container restart is not available in managed mode; \
                 restart the relay from the hosting platform's dashboard.",
                e
            )),
            Err(e) => ControlState::ReloadFailed(format!("Reload failed: {}", e)),
        };

        self.transition(next.clone());
        next
    }

    /// Restart the relay container (direct mode only).
    pub async fn restart(&mut self) -> ControlState {
        if self.mode == EnvironmentMode::Managed {
            let next = ControlState::RestartFailed(
                "Container restart is not available in managed mode; \
                 restart the relay from the hosting platform's dashboard."
                    .to_string(),
            );
            self.transition(next.clone());
            return next;
        }

        self.transition(ControlState::Restarting);
        let next = match self.restart_direct().await {
            Ok(message) => ControlState::Restarted(message),
            Err(message) => ControlState::RestartFailed(message),
        };
        self.transition(next.clone());
        next
    }

    async fn restart_direct(&self) -> Result<String, String> {
        match resolve_container(self.runtime.as_ref(), &self.candidates).await {
            Ok(container) => {
                let name = container.display_name().to_string();
                self.cycle_container(&container)
                    .await
                    .map(|()| format!("Relay restarted (container {}); new environment loaded", name))
                    .map_err(|e| format!("Container restart failed: {}", e))
            }
            Err(e) if e.is_unavailable() => {
                tracing::warn!(error = %e, service = %self.service, "Container API unavailable, falling back to CLI");
                self.supervisor
                    .restart(&self.service)
                    .await
                    .map(|_| format!("Relay restarted via CLI (service {})", self.service))
                    .map_err(|e| format!("CLI restart failed: {}", e))
            }
            Err(e) => Err(e.to_string()),
        }
    }

    async fn cycle_container(&self, container: &ContainerInfo) -> LifecycleResult<()> {
        tracing::info!(container = %container.display_name(), grace_secs = self.stop_grace.as_secs(), "Stopping relay container");
        self.runtime.stop(container, self.stop_grace).await?;
        tracing::info!(container = %container.display_name(), "Starting relay container");
        self.runtime.start(container).await
    }
}

impl fmt::Debug for ServiceController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceController")
            .field("mode", &self.mode)
            .field("relay", &self.relay)
            .field("candidates", &self.candidates)
            .field("service", &self.service)
            .field("state", &self.state)
            .finish()
    }
}
