//! Relay configuration schema.
//!
//! The relay is configured through a flat mapping of option name to scalar
//! value. This module defines that mapping, the recognized fields with their
//! defaults and constraints, and the grouping used when rendering the
//! environment-variable file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single configuration value.
///
/// Integers and strings are what the relay understands. Floats and booleans
/// are kept as-is when they show up in the structured document so that keys
/// added by hand are not silently rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl ConfigValue {
    /// Infer a value from its textual form, as found in an env file.
    ///
    /// Only plain ASCII digit strings become integers; signs, decimals and
    /// anything that overflows stay text.
    pub fn infer(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return ConfigValue::Integer(n);
            }
        }
        ConfigValue::Text(raw.to_string())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(n) => Some(*n),
            ConfigValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// True for the empty string, which means "unset".
    pub fn is_unset(&self) -> bool {
        matches!(self, ConfigValue::Text(s) if s.is_empty())
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Integer(n) => write!(f, "{}", n),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::Boolean(b) => write!(f, "{}", b),
            ConfigValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Integer(n)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Text(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Text(s)
    }
}

/// What a recognized field holds and how it is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer within an inclusive range.
    Integer { min: i64, max: i64 },
    /// URL with an allowed scheme.
    Url { allow_empty: bool },
    /// One of a fixed set of choices.
    Choice(&'static [&'static str]),
    /// Regular expression.
    Pattern,
    /// Free text.
    Text,
    /// Free text that must never be printed.
    Secret,
}

/// Default value of a recognized field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Int(i64),
    Str(&'static str),
}

impl From<FieldDefault> for ConfigValue {
    fn from(d: FieldDefault) -> Self {
        match d {
            FieldDefault::Int(n) => ConfigValue::Integer(n),
            FieldDefault::Str(s) => ConfigValue::Text(s.to_string()),
        }
    }
}

/// A recognized configuration field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub default: FieldDefault,
    pub kind: FieldKind,
}

pub const WEBHOOK_METHODS: &[&str] = &["POST", "GET"];

/// Every recognized field, in the order they are rendered to the env file.
pub const FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "BATCH_SIZE", default: FieldDefault::Int(10), kind: FieldKind::Integer { min: 1, max: 100 } },
    FieldSpec { key: "BATCH_TIMEOUT", default: FieldDefault::Int(30), kind: FieldKind::Integer { min: 1, max: 300 } },
    FieldSpec { key: "N8N_WEBHOOK_URL", default: FieldDefault::Str(""), kind: FieldKind::Url { allow_empty: true } },
    FieldSpec { key: "N8N_WEBHOOK_METHOD", default: FieldDefault::Str("POST"), kind: FieldKind::Choice(WEBHOOK_METHODS) },
    FieldSpec { key: "WS_URI", default: FieldDefault::Str("wss://pumpportal.fun/api/data"), kind: FieldKind::Url { allow_empty: false } },
    FieldSpec { key: "WS_RETRY_DELAY", default: FieldDefault::Int(3), kind: FieldKind::Integer { min: 1, max: 300 } },
    FieldSpec { key: "WS_MAX_RETRY_DELAY", default: FieldDefault::Int(60), kind: FieldKind::Integer { min: 1, max: 600 } },
    FieldSpec { key: "WS_PING_INTERVAL", default: FieldDefault::Int(20), kind: FieldKind::Integer { min: 1, max: 300 } },
    FieldSpec { key: "WS_PING_TIMEOUT", default: FieldDefault::Int(10), kind: FieldKind::Integer { min: 1, max: 300 } },
    FieldSpec { key: "WS_CONNECTION_TIMEOUT", default: FieldDefault::Int(30), kind: FieldKind::Integer { min: 1, max: 600 } },
    FieldSpec { key: "N8N_RETRY_DELAY", default: FieldDefault::Int(5), kind: FieldKind::Integer { min: 1, max: 60 } },
    FieldSpec { key: "BAD_NAMES_PATTERN", default: FieldDefault::Str("test|bot|rug|scam|cant|honey|faucet"), kind: FieldKind::Pattern },
    FieldSpec { key: "HEALTH_PORT", default: FieldDefault::Int(8000), kind: FieldKind::Integer { min: 1000, max: 65535 } },
    FieldSpec { key: "DB_HOST", default: FieldDefault::Str("localhost"), kind: FieldKind::Text },
    FieldSpec { key: "DB_PORT", default: FieldDefault::Int(5432), kind: FieldKind::Integer { min: 1, max: 65535 } },
    FieldSpec { key: "DB_NAME", default: FieldDefault::Str("pump_discover"), kind: FieldKind::Text },
    FieldSpec { key: "DB_USER", default: FieldDefault::Str("postgres"), kind: FieldKind::Text },
    FieldSpec { key: "DB_PASSWORD", default: FieldDefault::Str(""), kind: FieldKind::Secret },
];

/// Env file sections: heading and the keys rendered under it.
pub const ENV_SECTIONS: &[(&str, &[&str])] = &[
    ("Batch settings", &["BATCH_SIZE", "BATCH_TIMEOUT"]),
    ("n8n webhook (leave empty until n8n is set up)", &["N8N_WEBHOOK_URL", "N8N_WEBHOOK_METHOD"]),
    (
        "WebSocket settings",
        &["WS_URI", "WS_RETRY_DELAY", "WS_MAX_RETRY_DELAY", "WS_PING_INTERVAL", "WS_PING_TIMEOUT", "WS_CONNECTION_TIMEOUT"],
    ),
    ("n8n retry settings", &["N8N_RETRY_DELAY"]),
    ("Filter settings", &["BAD_NAMES_PATTERN"]),
    ("Health check port", &["HEALTH_PORT"]),
    ("Database settings (used by the console's database check)", &["DB_HOST", "DB_PORT", "DB_NAME", "DB_USER", "DB_PASSWORD"]),
];

/// Port-mapping keys for the compose project. Written to the env file,
/// never part of the editable configuration.
pub const DEPLOYMENT_KEYS: &[(&str, u16)] = &[("RELAY_PORT", 8000), ("UI_PORT", 8501)];

pub fn field(key: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.key == key)
}

pub fn is_deployment_key(key: &str) -> bool {
    DEPLOYMENT_KEYS.iter().any(|(k, _)| *k == key)
}

/// The relay configuration: a flat, ordered mapping of option name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayConfig {
    values: BTreeMap<String, ConfigValue>,
}

impl RelayConfig {
    /// The default configuration, with every recognized field.
    pub fn defaults() -> Self {
        let values = FIELDS
            .iter()
            .map(|f| (f.key.to_string(), ConfigValue::from(f.default)))
            .collect();
        Self { values }
    }

    /// Fill every missing recognized key from the defaults.
    /// Returns the keys that were added.
    pub fn fill_defaults(&mut self) -> Vec<&'static str> {
        let mut added = Vec::new();
        for f in FIELDS {
            if !self.values.contains_key(f.key) {
                self.values.insert(f.key.to_string(), f.default.into());
                added.push(f.key);
            }
        }
        added
    }

    /// True when every recognized key is present.
    pub fn is_complete(&self) -> bool {
        FIELDS.iter().all(|f| self.values.contains_key(f.key))
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(ConfigValue::as_i64)
    }

    /// Textual form of a value; empty when the key is missing.
    pub fn get_text(&self, key: &str) -> String {
        self.values.get(key).map(ToString::to_string).unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Set a value from operator input. Integer fields are parsed as
    /// integers, everything else is stored as given.
    pub fn set_from_str(&mut self, key: &str, raw: &str) -> Result<(), String> {
        let value = match field(key).map(|f| f.kind) {
            Some(FieldKind::Integer { .. }) => raw
                .trim()
                .parse::<i64>()
                .map(ConfigValue::Integer)
                .map_err(|_| format!("{} must be a whole number, got '{}'", key, raw))?,
            Some(_) => ConfigValue::Text(raw.to_string()),
            None => ConfigValue::infer(raw),
        };
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys present in this configuration that are not recognized fields.
    pub fn extra_keys(&self) -> impl Iterator<Item = &str> {
        self.keys().filter(|k| field(k).is_none())
    }
}

impl FromIterator<(String, ConfigValue)> for RelayConfig {
    fn from_iter<T: IntoIterator<Item = (String, ConfigValue)>>(iter: T) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}
