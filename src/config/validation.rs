//! Configuration validation.
//!
//! # Responsibilities
//! - Check single values (URL, port, regex pattern) for well-formedness
//! - Check a whole relay configuration against the field constraints
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Every check is a pure, total function; nothing here panics
//! - Runs in the caller before a save; the store persists whatever it is given
//! - Patterns are compiled with a backtracking engine so lookaround and
//!   backreferences accepted by the relay are accepted here too

use fancy_regex::Regex;
use thiserror::Error;
use url::Url;

use crate::config::schema::{FieldKind, RelayConfig, ConfigValue, FIELDS};

/// Schemes accepted for webhook and WebSocket URLs.
pub const ALLOWED_SCHEMES: &[&str] = &["http", "https", "ws", "wss"];

/// A malformed single value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0}")]
    InvalidUrl(String),

    #[error("{0}")]
    InvalidPort(String),

    #[error("{0}")]
    InvalidPattern(String),

    #[error("{0}")]
    OutOfRange(String),

    #[error("{0}")]
    InvalidChoice(String),
}

/// A validation error attached to the field it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {error}")]
pub struct FieldError {
    pub field: String,
    pub error: ValidationError,
}

pub fn validate_url(value: &str, allow_empty: bool) -> Result<(), ValidationError> {
    if value.is_empty() {
        return if allow_empty {
            Ok(())
        } else {
            Err(ValidationError::InvalidUrl("URL must not be empty".into()))
        };
    }

    let url = Url::parse(value).map_err(|_| ValidationError::InvalidUrl("Invalid URL format".into()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::InvalidUrl("Invalid URL format".into()));
    }
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(ValidationError::InvalidUrl(format!(
            "Invalid protocol: {}. Allowed: {}",
            url.scheme(),
            ALLOWED_SCHEMES.join(", ")
        )));
    }
    Ok(())
}

pub fn validate_port(value: &str) -> Result<(), ValidationError> {
    let port: i64 = value
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidPort("Port must be a number".into()))?;
    if (1..=65535).contains(&port) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPort("Port must be between 1 and 65535".into()))
    }
}

pub fn validate_regex(value: &str, allow_empty: bool) -> Result<(), ValidationError> {
    if value.is_empty() {
        return if allow_empty {
            Ok(())
        } else {
            Err(ValidationError::InvalidPattern("Pattern must not be empty".into()))
        };
    }
    Regex::new(value)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidPattern(format!("Invalid regex pattern: {}", e)))
}

fn validate_range(value: Option<&ConfigValue>, min: i64, max: i64) -> Result<(), ValidationError> {
    match value.and_then(ConfigValue::as_i64) {
        Some(n) if (min..=max).contains(&n) => Ok(()),
        Some(n) => Err(ValidationError::OutOfRange(format!("{} is outside {}..={}", n, min, max))),
        None => Err(ValidationError::OutOfRange(format!("must be a whole number between {} and {}", min, max))),
    }
}

/// Validate every recognized field of `config`.
///
/// Missing keys are checked as if they held their default, which is what
/// a subsequent load would fill in.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    for entry in FIELDS {
        let default = ConfigValue::from(entry.default);
        let value = config.get(entry.key).unwrap_or(&default);
        let text = value.to_string();

        let result = match entry.kind {
            FieldKind::Integer { min, max } => {
                if entry.key.ends_with("_PORT") {
                    validate_port(&text).and_then(|_| validate_range(Some(value), min, max))
                } else {
                    validate_range(Some(value), min, max)
                }
            }
            FieldKind::Url { allow_empty } => validate_url(&text, allow_empty),
            FieldKind::Pattern => validate_regex(&text, true),
            FieldKind::Choice(choices) => {
                if choices.contains(&text.as_str()) {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidChoice(format!(
                        "'{}' is not one of {}",
                        text,
                        choices.join(", ")
                    )))
                }
            }
            FieldKind::Text | FieldKind::Secret => Ok(()),
        };

        if let Err(error) = result {
            errors.push(FieldError { field: entry.key.to_string(), error });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
