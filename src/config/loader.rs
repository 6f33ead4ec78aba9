//! Console settings loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::settings::{ConsoleSettings, EnvironmentMode};

/// Error type for settings loading.
#[derive(Debug)]
pub enum SettingsError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String },
    Validation(Vec<String>),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(path, e) => write!(f, "IO error reading {}: {}", path.display(), e),
            SettingsError::Parse(e) => write!(f, "Parse error: {}", e),
            SettingsError::Env { var, value } => write!(f, "Invalid value for {}: '{}'", var, value),
            SettingsError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SettingsError {}

/// Load settings: optional TOML file, then environment overrides, then
/// validation.
pub fn load_settings(path: Option<&Path>) -> Result<ConsoleSettings, SettingsError> {
    let mut settings = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| SettingsError::Io(path.to_path_buf(), e))?;
            toml::from_str(&content).map_err(SettingsError::Parse)?
        }
        None => ConsoleSettings::default(),
    };

    apply_env_overrides(&mut settings, |var| std::env::var(var).ok())?;
    validate_settings(&settings).map_err(SettingsError::Validation)?;

    Ok(settings)
}

/// Apply `COOLIFY_MODE`, `RELAY_SERVICE`, `RELAY_PORT` and a `unix://`
/// `DOCKER_HOST` on top of `settings`.
pub fn apply_env_overrides<F>(settings: &mut ConsoleSettings, lookup: F) -> Result<(), SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(flag) = lookup("COOLIFY_MODE") {
        settings.mode = EnvironmentMode::from_flag(&flag);
    }
    if let Some(service) = lookup("RELAY_SERVICE") {
        settings.relay_service = service;
    }
    if let Some(port) = lookup("RELAY_PORT") {
        settings.relay_port = port
            .trim()
            .parse()
            .map_err(|_| SettingsError::Env { var: "RELAY_PORT", value: port.clone() })?;
    }
    if let Some(host) = lookup("DOCKER_HOST") {
        match host.strip_prefix("unix://") {
            Some(socket) => settings.docker_socket = PathBuf::from(socket),
            None => tracing::warn!(docker_host = %host, "Only unix:// DOCKER_HOST is supported, using default socket"),
        }
    }
    Ok(())
}

/// Semantic checks on the settings. Returns every problem found.
pub fn validate_settings(settings: &ConsoleSettings) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if settings.relay_service.trim().is_empty() {
        errors.push("relay_service must not be empty".to_string());
    }
    if settings.relay_port == 0 {
        errors.push("relay_port must be between 1 and 65535".to_string());
    }
    if settings.document_path.as_os_str().is_empty() {
        errors.push("document_path must not be empty".to_string());
    }
    if settings.env_write_paths.is_empty() {
        errors.push("env_write_paths must list at least one path".to_string());
    }
    if settings.compose_binaries.iter().any(Vec::is_empty) {
        errors.push("compose_binaries entries must not be empty".to_string());
    }
    if settings.compose_service.trim().is_empty() {
        errors.push("compose_service must not be empty".to_string());
    }
    if !(1..=10_000).contains(&settings.log_lines) {
        errors.push("log_lines must be between 1 and 10000".to_string());
    }
    for (name, secs) in settings.timeouts.named() {
        if secs == 0 {
            errors.push(format!("timeouts.{} must be greater than 0", name));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = ConsoleSettings::default();
        apply_env_overrides(
            &mut settings,
            lookup(&[
                ("COOLIFY_MODE", "true"),
                ("RELAY_SERVICE", "api"),
                ("RELAY_PORT", "9000"),
                ("DOCKER_HOST", "unix:///run/user/1000/docker.sock"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.mode, EnvironmentMode::Managed);
        assert_eq!(settings.relay_url(), "http://api:9000");
        assert_eq!(settings.docker_socket, PathBuf::from("/run/user/1000/docker.sock"));
    }

    #[test]
    fn test_bad_relay_port() {
        let mut settings = ConsoleSettings::default();
        let err = apply_env_overrides(&mut settings, lookup(&[("RELAY_PORT", "eighty")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for RELAY_PORT: 'eighty'");
    }

    #[test]
    fn test_validation_reports_everything() {
        let mut settings = ConsoleSettings::default();
        settings.relay_service = String::new();
        settings.env_write_paths.clear();
        settings.timeouts.reload_secs = 0;

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("timeouts.reload_secs")));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
mode = "managed"
relay_port = 8100
document_path = "/srv/console/config.toml"

[timeouts]
compose_secs = 60
"#
        )
        .unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        let settings: ConsoleSettings = toml::from_str(&content).unwrap();
        assert_eq!(settings.mode, EnvironmentMode::Managed);
        assert_eq!(settings.relay_port, 8100);
        assert_eq!(settings.timeouts.compose_secs, 60);
        // Untouched fields keep their defaults
        assert_eq!(settings.timeouts.health_secs, 2);
        assert_eq!(settings.compose_service, "relay");
        assert!(validate_settings(&settings).is_ok());
    }
}
