//! Operator console facade.
//!
//! # Responsibilities
//! - Wire the console settings into the store, probe, controller and log
//!   retriever
//! - Validate configuration edits before they are persisted
//!
//! # Design Decisions
//! - Drivers are injected so tests can replace the container runtime and
//!   the supervision CLI
//! - Configuration is re-read from disk on every action

use std::sync::Arc;
use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::settings::ConsoleSettings;
use crate::config::store::{ConfigError, ConfigSource, ConfigStore, SaveReport};
use crate::config::validation::{validate_config, FieldError};
use crate::database::{DatabaseProbe, DbStatus};
use crate::lifecycle::{ComposeCli, ContainerRuntime, ControlState, DockerEngine, LogRetriever, ServiceController, Supervisor};
use crate::probe::{HealthSnapshot, MetricsSnapshot, ProbeError, ProbeResult, RelayClient};

/// Errors from console actions that change the configuration.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("configuration rejected:\n{}", format_field_errors(.0))]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors.iter().map(|e| format!("  {}", e)).collect::<Vec<_>>().join("\n")
}

/// Entry point for every operator action.
pub struct Console {
    settings: ConsoleSettings,
    store: ConfigStore,
    relay: RelayClient,
    controller: ServiceController,
    logs: LogRetriever,
}

impl Console {
    /// Build a console with the real Docker Engine and compose drivers.
    pub fn new(settings: ConsoleSettings) -> Result<Self, ConsoleError> {
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerEngine::from_settings(&settings));
        let supervisor: Arc<dyn Supervisor> = Arc::new(ComposeCli::from_settings(&settings));
        Self::with_drivers(settings, runtime, supervisor)
    }

    pub fn with_drivers(
        settings: ConsoleSettings,
        runtime: Arc<dyn ContainerRuntime>,
        supervisor: Arc<dyn Supervisor>,
    ) -> Result<Self, ConsoleError> {
        let relay = RelayClient::from_settings(&settings)?;
        let controller = ServiceController::new(&settings, relay.clone(), runtime.clone(), supervisor.clone());
        let logs = LogRetriever::new(&settings, relay.clone(), runtime, supervisor);

        tracing::debug!(mode = %settings.mode, relay = %relay.base_url(), "Console ready");
        Ok(Self {
            store: ConfigStore::from_settings(&settings),
            settings,
            relay,
            controller,
            logs,
        })
    }

    pub fn settings(&self) -> &ConsoleSettings {
        &self.settings
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn controller(&self) -> &ServiceController {
        &self.controller
    }

    pub async fn health(&self) -> ProbeResult<HealthSnapshot> {
        self.relay.get_health().await
    }

    /// Raw exposition text and its parsed form.
    pub async fn metrics(&self) -> ProbeResult<(String, MetricsSnapshot)> {
        let text = self.relay.get_metrics().await?;
        let snapshot = MetricsSnapshot::parse(&text);
        Ok((text, snapshot))
    }

    pub fn load_config(&self) -> (RelayConfig, ConfigSource) {
        self.store.load_with_source()
    }

    /// Validate and persist a complete configuration.
    pub fn save_config(&self, config: &RelayConfig) -> Result<SaveReport, ConsoleError> {
        validate_config(config).map_err(ConsoleError::Invalid)?;
        Ok(self.store.save(config)?)
    }

    /// Change one key, validate the result and persist it.
    pub fn set_value(&self, key: &str, raw: &str) -> Result<SaveReport, ConsoleError> {
        self.set_values([(key, raw)])
    }

    /// Apply every assignment to one loaded configuration, then validate and
    /// persist it once. Nothing is written if any assignment is rejected.
    pub fn set_values<'a, I>(&self, assignments: I) -> Result<SaveReport, ConsoleError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = self.store.load();
        for (key, raw) in assignments {
            config.set_from_str(key, raw).map_err(|reason| ConsoleError::InvalidValue {
                key: key.to_string(),
                reason,
            })?;
        }
        self.save_config(&config)
    }

    /// Overwrite the stored configuration with defaults.
    pub fn reset_config(&self) -> Result<SaveReport, ConsoleError> {
        Ok(self.store.reset()?)
    }

    /// Check the stored configuration without changing it.
    pub fn validate_stored(&self) -> Result<(), Vec<FieldError>> {
        validate_config(&self.store.load())
    }

    /// Make the saved configuration take effect on the relay.
    pub async fn apply(&mut self) -> ControlState {
        self.controller.apply().await
    }

    pub async fn reload(&mut self) -> ControlState {
        self.controller.reload().await
    }

    pub async fn restart(&mut self) -> ControlState {
        self.controller.restart().await
    }

    /// Recent relay logs, newest first. `None` uses the configured default.
    pub async fn logs(&self, lines: Option<u32>) -> String {
        self.logs.fetch(lines.unwrap_or(self.settings.log_lines)).await
    }

    pub async fn check_database(&self) -> DbStatus {
        let config = self.store.load();
        DatabaseProbe::from_config(&config, self.settings.timeouts.database())
            .check()
            .await
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("mode", &self.settings.mode)
            .field("store", &self.store)
            .field("controller", &self.controller)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn console_in(dir: &TempDir) -> Console {
        let root = dir.path();
        let settings = ConsoleSettings {
            relay_service: "127.0.0.1".into(),
            relay_port: 1,
            document_path: root.join("config/config.toml"),
            env_read_paths: vec![root.join(".env")],
            env_write_paths: vec![root.join("config/.env")],
            docker_socket: root.join("docker.sock"),
            compose_binaries: vec![],
            compose_files: vec![],
            ..ConsoleSettings::default()
        };
        Console::new(settings).unwrap()
    }

    #[test]
    fn test_set_value_persists_both_formats() {
        let dir = TempDir::new().unwrap();
        let console = console_in(&dir);

        let report = console.set_value("BATCH_SIZE", "25").unwrap();
        assert!(report.propagated());

        let (config, source) = console.load_config();
        assert_eq!(config.get_i64("BATCH_SIZE"), Some(25));
        assert!(matches!(source, ConfigSource::Document(_)));
        let env = std::fs::read_to_string(dir.path().join("config/.env")).unwrap();
        assert!(env.contains("BATCH_SIZE=25"));
    }

    #[test]
    fn test_set_value_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let console = console_in(&dir);
        console.reset_config().unwrap();

        let err = console.set_value("N8N_WEBHOOK_URL", "ftp://example.com/hook").unwrap_err();
        assert!(matches!(err, ConsoleError::Invalid(_)));
        assert!(err.to_string().contains("ftp"));

        let err = console.set_value("BATCH_SIZE", "many").unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidValue { .. }));

        // Nothing was written by the rejected edits
        assert!(console.validate_stored().is_ok());
        assert_eq!(console.load_config().0, RelayConfig::defaults());
    }

    #[test]
    fn test_set_values_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let console = console_in(&dir);
        console.reset_config().unwrap();

        let err = console.set_values([("BATCH_SIZE", "25"), ("HEALTH_PORT", "70000")]).unwrap_err();
        assert!(err.to_string().contains("HEALTH_PORT"));
        let err = console.set_values([("BATCH_SIZE", "25"), ("BATCH_TIMEOUT", "soon")]).unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidValue { ref key, .. } if key == "BATCH_TIMEOUT"));
        assert_eq!(console.load_config().0.get_i64("BATCH_SIZE"), Some(10));

        console.set_values([("BATCH_SIZE", "25"), ("BATCH_TIMEOUT", "45")]).unwrap();
        let (config, _) = console.load_config();
        assert_eq!(config.get_i64("BATCH_SIZE"), Some(25));
        assert_eq!(config.get_i64("BATCH_TIMEOUT"), Some(45));
    }

    #[tokio::test]
    async fn test_logs_placeholder_when_nothing_reachable() {
        let dir = TempDir::new().unwrap();
        let console = console_in(&dir);

        let text = console.logs(Some(10)).await;
        assert!(text.starts_with("Failed to fetch logs"), "got {text}");
    }
}
