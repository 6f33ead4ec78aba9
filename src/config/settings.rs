//! Console settings.
//!
//! Process-wide inputs of the console itself: which environment it runs in,
//! where the relay lives, where configuration files may be found, which
//! containers and CLI binaries to try, and how long each call may take.
//! Loaded once at startup and handed to every component that needs it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Deployment environment the console runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentMode {
    /// No privileged lifecycle access; only the relay's reload endpoint.
    Managed,
    /// Container API or process-supervision CLI available.
    #[default]
    Direct,
}

impl EnvironmentMode {
    /// Interpret the `COOLIFY_MODE` flag.
    pub fn from_flag(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("true") {
            EnvironmentMode::Managed
        } else {
            EnvironmentMode::Direct
        }
    }
}

impl fmt::Display for EnvironmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentMode::Managed => f.write_str("managed"),
            EnvironmentMode::Direct => f.write_str("direct"),
        }
    }
}

/// Root settings for the console.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Deployment environment.
    pub mode: EnvironmentMode,

    /// Host name (container name or network alias) of the relay.
    pub relay_service: String,

    /// Port of the relay's HTTP API.
    pub relay_port: u16,

    /// Structured configuration document.
    pub document_path: PathBuf,

    /// Env files read when the structured document is missing, in order.
    pub env_read_paths: Vec<PathBuf>,

    /// Env file write targets, in order; the first writable one wins.
    pub env_write_paths: Vec<PathBuf>,

    /// Container names tried after `relay_service`.
    pub container_names: Vec<String>,

    /// Docker Engine API socket.
    pub docker_socket: PathBuf,

    /// Supervision CLI invocations to probe, e.g. `["docker", "compose"]`.
    pub compose_binaries: Vec<Vec<String>>,

    /// Compose project descriptors, in order.
    pub compose_files: Vec<PathBuf>,

    /// Service name of the relay inside the compose project.
    pub compose_service: String,

    /// Default number of log lines to fetch.
    pub log_lines: u32,

    /// Per-operation deadlines.
    pub timeouts: TimeoutSettings,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            mode: EnvironmentMode::Direct,
            relay_service: "pump-discover-relay".to_string(),
            relay_port: 8000,
            document_path: PathBuf::from("/app/config/config.toml"),
            env_read_paths: vec![
                PathBuf::from("/app/.env"),
                PathBuf::from("/app/../.env"),
                PathBuf::from("/app/config/.env"),
                PathBuf::from(".env"),
            ],
            env_write_paths: vec![
                PathBuf::from("/app/config/.env"),
                PathBuf::from("/app/.env"),
                PathBuf::from("/app/../.env"),
            ],
            container_names: vec!["pump-discover-relay".to_string(), "relay".to_string()],
            docker_socket: PathBuf::from("/var/run/docker.sock"),
            compose_binaries: vec![
                vec!["docker".to_string(), "compose".to_string()],
                vec!["docker-compose".to_string()],
            ],
            compose_files: vec![
                PathBuf::from("/app/../docker-compose.yml"),
                PathBuf::from("/app/docker-compose.yml"),
            ],
            compose_service: "relay".to_string(),
            log_lines: 100,
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl ConsoleSettings {
    /// Base URL of the relay's HTTP API.
    pub fn relay_url(&self) -> String {
        format!("http://{}:{}", self.relay_service, self.relay_port)
    }

    /// Container names to try, `relay_service` first, without duplicates.
    pub fn container_candidates(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.container_names.len() + 1);
        for name in std::iter::once(&self.relay_service).chain(&self.container_names) {
            if !name.is_empty() && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Deadlines, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub health_secs: u64,
    pub metrics_secs: u64,
    pub reload_secs: u64,
    pub logs_secs: u64,
    /// Grace period given to the relay on container stop.
    pub stop_grace_secs: u64,
    pub docker_api_secs: u64,
    pub compose_secs: u64,
    pub compose_logs_secs: u64,
    pub version_probe_secs: u64,
    pub database_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            health_secs: 2,
            metrics_secs: 2,
            reload_secs: 5,
            logs_secs: 5,
            stop_grace_secs: 10,
            docker_api_secs: 10,
            compose_secs: 30,
            compose_logs_secs: 10,
            version_probe_secs: 5,
            database_secs: 5,
        }
    }
}

impl TimeoutSettings {
    pub fn health(&self) -> Duration {
        Duration::from_secs(self.health_secs)
    }

    pub fn metrics(&self) -> Duration {
        Duration::from_secs(self.metrics_secs)
    }

    pub fn reload(&self) -> Duration {
        Duration::from_secs(self.reload_secs)
    }

    pub fn logs(&self) -> Duration {
        Duration::from_secs(self.logs_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    pub fn docker_api(&self) -> Duration {
        Duration::from_secs(self.docker_api_secs)
    }

    pub fn compose(&self) -> Duration {
        Duration::from_secs(self.compose_secs)
    }

    pub fn compose_logs(&self) -> Duration {
        Duration::from_secs(self.compose_logs_secs)
    }

    pub fn version_probe(&self) -> Duration {
        Duration::from_secs(self.version_probe_secs)
    }

    pub fn database(&self) -> Duration {
        Duration::from_secs(self.database_secs)
    }

    pub(crate) fn named(&self) -> [(&'static str, u64); 10] {
        [
            ("health_secs", self.health_secs),
            ("metrics_secs", self.metrics_secs),
            ("reload_secs", self.reload_secs),
            ("logs_secs", self.logs_secs),
            ("stop_grace_secs", self.stop_grace_secs),
            ("docker_api_secs", self.docker_api_secs),
            ("compose_secs", self.compose_secs),
            ("compose_logs_secs", self.compose_logs_secs),
            ("version_probe_secs", self.version_probe_secs),
            ("database_secs", self.database_secs),
        ]
    }
}
