//! Environment-variable file format.
//!
//! The relay reads its settings from a flat `KEY=VALUE` file at startup
//! (and on `/reload-config`). This module renders a [`RelayConfig`] into
//! that format and parses it back, inferring integer values.

use std::fmt::Write as _;

use crate::config::schema::{field, is_deployment_key, RelayConfig, ConfigValue, DEPLOYMENT_KEYS, ENV_SECTIONS};

const HEADER: &str = "\
# ============================================================================
# PUMP DISCOVER - environment variables
# ============================================================================
# This file is managed by the relay console.
# Changes take effect when the relay reloads its configuration or restarts.
# ============================================================================
";

/// Render the env file for `config`.
///
/// Recognized keys are written in their sections (falling back to the
/// default for a missing key), unrecognized keys follow, and the fixed
/// deployment port keys come last.
pub fn render(config: &RelayConfig) -> String {
    let mut out = String::from(HEADER);

    for (heading, keys) in ENV_SECTIONS {
        let _ = writeln!(out, "\n# {}", heading);
        for key in keys.iter() {
            let value = match config.get(key) {
                Some(value) => value.to_string(),
                None => field(key).map(|f| ConfigValue::from(f.default).to_string()).unwrap_or_default(),
            };
            let _ = writeln!(out, "{}={}", key, sanitize(&value));
        }
    }

    let extra: Vec<&str> = config.extra_keys().filter(|k| !is_deployment_key(k)).collect();
    if !extra.is_empty() {
        out.push_str("\n# Additional settings\n");
        for key in extra {
            let _ = writeln!(out, "{}={}", key, sanitize(&config.get_text(key)));
        }
    }

    out.push_str("\n# Docker Compose ports\n");
    for (key, port) in DEPLOYMENT_KEYS {
        let _ = writeln!(out, "{}={}", key, port);
    }

    out
}

/// Parse env file content into a configuration.
///
/// Blank lines, comments and lines without `=` are skipped. Deployment port
/// keys are dropped. Missing keys are NOT filled here.
pub fn parse(content: &str) -> RelayConfig {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty() && !is_deployment_key(key))
        .map(|(key, value)| (key.to_string(), ConfigValue::infer(value)))
        .collect()
}

// A value spanning lines would corrupt every following entry.
fn sanitize(value: &str) -> String {
    if value.contains(['\n', '\r']) {
        value.replace(['\n', '\r'], " ")
    } else {
        value.to_string()
    }
}
