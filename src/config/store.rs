//! Configuration store.
//!
//! # Responsibilities
//! - Load the relay configuration from the structured document, or from the
//!   first readable env file when the document is missing
//! - Generate and persist defaults on a fresh deployment
//! - Persist the structured document and propagate the env file
//!
//! # Design Decisions
//! - The structured document is authoritative; writing it must succeed
//! - Env file propagation is best-effort and reported separately
//! - No locking: concurrent writers race, last write wins

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::envfile;
use crate::config::schema::RelayConfig;
use crate::config::settings::ConsoleSettings;
use crate::resilience::{first_success, Exhausted};

/// Structured document failures. Fatal to a save.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to create config directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The env file could not be written to any candidate path.
///
/// Non-fatal: the document was saved, but the relay will not see the change.
#[derive(Debug)]
pub struct PropagationWarning {
    pub attempts: Exhausted<PathBuf, io::Error>,
}

impl fmt::Display for PropagationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "env file not written, the relay will not pick up this change")?;
        for attempt in &self.attempts.attempts {
            write!(f, "\n  {}: {}", attempt.candidate.display(), attempt.error)?;
        }
        if self.attempts.is_empty() {
            write!(f, " (no env file paths configured)")?;
        }
        Ok(())
    }
}

impl std::error::Error for PropagationWarning {}

/// Outcome of a successful save.
#[derive(Debug)]
pub struct SaveReport {
    /// Where the structured document was written.
    pub document: PathBuf,
    /// Where the env file was written, or why it could not be.
    pub env_file: Result<PathBuf, PropagationWarning>,
}

impl SaveReport {
    pub fn propagated(&self) -> bool {
        self.env_file.is_ok()
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// The structured document.
    Document(PathBuf),
    /// An env file, because the document was missing or empty.
    EnvFile(PathBuf),
    /// Stored configuration was empty or unreadable; defaults returned,
    /// nothing written.
    Defaults,
    /// Nothing existed; defaults generated and persisted.
    Generated,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Document(path) => write!(f, "document {}", path.display()),
            ConfigSource::EnvFile(path) => write!(f, "env file {}", path.display()),
            ConfigSource::Defaults => f.write_str("defaults (stored configuration empty or unreadable, not saved)"),
            ConfigSource::Generated => f.write_str("defaults (generated on first start)"),
        }
    }
}

/// Outcome of scanning the env file candidates.
enum EnvRead {
    Loaded(PathBuf, RelayConfig),
    /// At least one candidate exists but none could be read.
    Unreadable,
    Missing,
}

/// Loads and persists the relay configuration in both formats.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    document_path: PathBuf,
    env_read_paths: Vec<PathBuf>,
    env_write_paths: Vec<PathBuf>,
}

impl ConfigStore {
    pub fn new(document_path: PathBuf, env_read_paths: Vec<PathBuf>, env_write_paths: Vec<PathBuf>) -> Self {
        Self {
            document_path,
            env_read_paths,
            env_write_paths,
        }
    }

    pub fn from_settings(settings: &ConsoleSettings) -> Self {
        Self::new(
            settings.document_path.clone(),
            settings.env_read_paths.clone(),
            settings.env_write_paths.clone(),
        )
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// The default configuration.
    pub fn defaults() -> RelayConfig {
        RelayConfig::defaults()
    }

    /// Load the configuration. Every recognized key is present in the result.
    pub fn load(&self) -> RelayConfig {
        self.load_with_source().0
    }

    /// Load the configuration and report where it came from.
    ///
    /// Defaults are only persisted when no configuration file exists at all.
    /// A file that exists but cannot be read or parsed is never overwritten.
    pub fn load_with_source(&self) -> (RelayConfig, ConfigSource) {
        let mut unusable = false;
        match self.read_document() {
            Ok(Some(mut config)) => {
                let added = config.fill_defaults();
                if !added.is_empty() {
                    tracing::debug!(keys = ?added, "Filled missing keys from defaults");
                }
                return (config, ConfigSource::Document(self.document_path.clone()));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Structured document unusable, falling back to env files");
                unusable = true;
            }
        }

        match self.read_env_file() {
            EnvRead::Loaded(path, mut config) if !config.is_empty() => {
                config.fill_defaults();
                tracing::info!(path = %path.display(), "Configuration loaded from env file");
                (config, ConfigSource::EnvFile(path))
            }
            EnvRead::Loaded(path, _) => {
                tracing::info!(path = %path.display(), "Env file is empty, using defaults");
                (RelayConfig::defaults(), ConfigSource::Defaults)
            }
            EnvRead::Unreadable => {
                tracing::warn!("Configuration exists but is unreadable, using defaults without saving");
                (RelayConfig::defaults(), ConfigSource::Defaults)
            }
            EnvRead::Missing if unusable => {
                tracing::warn!(
                    document = %self.document_path.display(),
                    "Structured document left untouched, using defaults without saving"
                );
                (RelayConfig::defaults(), ConfigSource::Defaults)
            }
            EnvRead::Missing => {
                let config = RelayConfig::defaults();
                match self.save(&config) {
                    Ok(report) => {
                        tracing::info!(
                            document = %report.document.display(),
                            env_written = report.propagated(),
                            "No configuration found, generated defaults"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "No configuration found and defaults could not be persisted");
                    }
                }
                (config, ConfigSource::Generated)
            }
        }
    }

    /// Read the structured document. `Ok(None)` when it is missing or empty.
    fn read_document(&self) -> Result<Option<RelayConfig>, ConfigError> {
        let path = &self.document_path;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Read { path: path.clone(), source }),
        };

        let config: RelayConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        Ok(if config.is_empty() { None } else { Some(config) })
    }

    /// Parse the first env file candidate that exists and can be read.
    fn read_env_file(&self) -> EnvRead {
        let result = first_success(self.env_read_paths.iter().cloned(), |path| fs::read_to_string(path));
        match result {
            Ok((path, content)) => EnvRead::Loaded(path, envfile::parse(&content)),
            Err(exhausted) => {
                let mut unreadable = false;
                for attempt in &exhausted.attempts {
                    if attempt.error.kind() != io::ErrorKind::NotFound {
                        tracing::warn!(
                            path = %attempt.candidate.display(),
                            error = %attempt.error,
                            "Env file exists but could not be read"
                        );
                        unreadable = true;
                    }
                }
                if unreadable {
                    EnvRead::Unreadable
                } else {
                    EnvRead::Missing
                }
            }
        }
    }

    /// Persist `config`: the structured document (must succeed), then the env
    /// file (best-effort).
    pub fn save(&self, config: &RelayConfig) -> Result<SaveReport, ConfigError> {
        let document = self.write_document(config)?;
        let env_file = self.propagate(config);

        match &env_file {
            Ok(path) => tracing::info!(
                document = %document.display(),
                env_file = %path.display(),
                "Configuration saved"
            ),
            Err(warning) => tracing::warn!(
                document = %document.display(),
                attempts = warning.attempts.attempts.len(),
                "Configuration saved, env file not propagated"
            ),
        }

        Ok(SaveReport { document, env_file })
    }

    /// Save the default configuration.
    pub fn reset(&self) -> Result<SaveReport, ConfigError> {
        self.save(&RelayConfig::defaults())
    }

    /// Write the structured document.
    pub fn write_document(&self, config: &RelayConfig) -> Result<PathBuf, ConfigError> {
        let path = &self.document_path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string(config)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path.clone())
    }

    /// Write the env file to the first writable candidate.
    pub fn propagate(&self, config: &RelayConfig) -> Result<PathBuf, PropagationWarning> {
        let content = envfile::render(config);

        first_success(self.env_write_paths.iter().cloned(), |path| {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            fs::write(path, &content).map_err(|e| {
                tracing::debug!(path = %path.display(), error = %e, "Env file candidate not writable");
                e
            })
        })
        .map(|(path, ())| path)
        .map_err(|attempts| PropagationWarning { attempts })
    }
}
