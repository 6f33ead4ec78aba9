//! Lifecycle driver traits, types and error definitions.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from container or process-supervision operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The container API cannot be reached at all.
    #[error("container runtime unavailable at {}: {reason}", socket.display())]
    RuntimeUnavailable { socket: PathBuf, reason: String },

    /// None of the candidate names resolved to a container.
    #[error("container not found (tried: {})", candidates.join(", "))]
    ContainerNotFound { candidates: Vec<String> },

    /// The container API answered with an error.
    #[error("container API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// No supervision CLI answered its version check.
    #[error("no supervision CLI found (tried: {})", tried.join(", "))]
    CliNotFound { tried: Vec<String> },

    /// No compose project descriptor was found.
    #[error("compose file not found (tried: {})", tried.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    DescriptorNotFound { tried: Vec<PathBuf> },

    /// A CLI command ran and failed.
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl LifecycleError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LifecycleError::RuntimeUnavailable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LifecycleError::ContainerNotFound { .. })
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// A resolved container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContainerInfo {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Config", default)]
    pub config: ContainerConfig,
    #[serde(rename = "State", default)]
    pub state: ContainerState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerConfig {
    #[serde(rename = "Tty", default)]
    pub tty: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerState {
    #[serde(rename = "Status", default)]
    pub status: String,
}

impl ContainerInfo {
    /// Container name without the leading `/` the API adds.
    pub fn display_name(&self) -> &str {
        self.name.trim_start_matches('/')
    }
}

/// Privileged container control (Docker Engine API or equivalent).
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Succeeds when the runtime API is reachable.
    async fn ping(&self) -> LifecycleResult<()>;

    /// Look a container up by name or id.
    async fn inspect(&self, name: &str) -> LifecycleResult<ContainerInfo>;

    /// Stop a container, giving it `grace` before it is killed.
    async fn stop(&self, container: &ContainerInfo, grace: Duration) -> LifecycleResult<()>;

    async fn start(&self, container: &ContainerInfo) -> LifecycleResult<()>;

    /// Last `tail` log lines with timestamps, oldest first.
    async fn logs(&self, container: &ContainerInfo, tail: u32) -> LifecycleResult<String>;
}

/// Process-supervision CLI (docker compose).
#[async_trait]
pub trait Supervisor: Send + Sync {
    /// Restart `service`. Returns the CLI's output on success.
    async fn restart(&self, service: &str) -> LifecycleResult<String>;

    /// Last `lines` log lines of `service`, oldest first.
    async fn tail_logs(&self, service: &str, lines: u32) -> LifecycleResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_payload() {
        let info: ContainerInfo = serde_json::from_str(
            r#"{"Id":"abc123","Name":"/pump-discover-relay","Config":{"Tty":false,"Image":"relay"},"State":{"Status":"running","Pid":42}}"#,
        )
        .unwrap();
        assert_eq!(info.id, "abc123");
        assert_eq!(info.display_name(), "pump-discover-relay");
        assert!(!info.config.tty);
        assert_eq!(info.state.status, "running");
    }

    #[test]
    fn test_error_messages_name_candidates() {
        let err = LifecycleError::CliNotFound { tried: vec!["docker compose".into(), "docker-compose".into()] };
        assert_eq!(err.to_string(), "no supervision CLI found (tried: docker compose, docker-compose)");

        let err = LifecycleError::ContainerNotFound { candidates: vec!["pump-discover-relay".into(), "relay".into()] };
        assert_eq!(err.to_string(), "container not found (tried: pump-discover-relay, relay)");

        let err = LifecycleError::DescriptorNotFound { tried: vec![PathBuf::from("/app/docker-compose.yml")] };
        assert!(err.to_string().contains("/app/docker-compose.yml"));
    }
}
