//! Prometheus text exposition parsing.
//!
//! # Responsibilities
//! - Turn the relay's `/metrics` text into a name → value mapping
//! - Typed access to the relay's own metric families
//!
//! # Metrics
//! - `pumpfun_coins_received_total` (counter): coins received from the feed
//! - `pumpfun_coins_sent_total` (counter): coins forwarded to n8n
//! - `pumpfun_coins_filtered_total` (counter): coins dropped by the name filter
//! - `pumpfun_batches_sent_total` (counter): webhook batches sent
//! - `pumpfun_ws_connected` (gauge): 1=connected, 0=disconnected
//! - `pumpfun_n8n_available` (gauge): 1=available, 0=unavailable
//! - `pumpfun_buffer_size` (gauge): coins waiting for the next batch
//! - `pumpfun_ws_reconnects_total` (counter): feed reconnects
//!
//! # Design Decisions
//! - Labels are not interpreted; the full sample name is the key
//! - Duplicate names: last sample wins, no aggregation

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const COINS_RECEIVED: &str = "pumpfun_coins_received_total";
pub const COINS_SENT: &str = "pumpfun_coins_sent_total";
pub const COINS_FILTERED: &str = "pumpfun_coins_filtered_total";
pub const BATCHES_SENT: &str = "pumpfun_batches_sent_total";
pub const WS_CONNECTED: &str = "pumpfun_ws_connected";
pub const N8N_AVAILABLE: &str = "pumpfun_n8n_available";
pub const BUFFER_SIZE: &str = "pumpfun_buffer_size";
pub const WS_RECONNECTS: &str = "pumpfun_ws_reconnects_total";

/// A parsed sample value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
    /// Kept verbatim when it is neither (e.g. `+Inf` or a malformed value).
    Raw(String),
}

impl MetricValue {
    fn parse(raw: &str) -> Self {
        let parsed = if raw.contains('.') {
            raw.parse::<f64>().ok().map(MetricValue::Float)
        } else {
            raw.parse::<i64>().ok().map(MetricValue::Integer)
        };
        parsed.unwrap_or_else(|| MetricValue::Raw(raw.to_string()))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Integer(n) => Some(*n as f64),
            MetricValue::Float(x) => Some(*x),
            MetricValue::Raw(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(n) => write!(f, "{}", n),
            MetricValue::Float(x) => write!(f, "{}", x),
            MetricValue::Raw(s) => f.write_str(s),
        }
    }
}

/// Parse Prometheus text exposition into a name → value mapping.
pub fn parse_metrics(text: &str) -> BTreeMap<String, MetricValue> {
    let mut metrics = BTreeMap::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        if let (Some(name), Some(value)) = (parts.next(), parts.next()) {
            metrics.insert(name.to_string(), MetricValue::parse(value));
        }
    }
    metrics
}

/// Parsed metrics with accessors for the relay's metric families.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MetricsSnapshot {
    values: BTreeMap<String, MetricValue>,
}

impl MetricsSnapshot {
    pub fn parse(text: &str) -> Self {
        Self { values: parse_metrics(text) }
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.values.get(name)
    }

    /// Numeric value, 0 when the metric is missing or not numeric.
    pub fn value(&self, name: &str) -> f64 {
        self.get(name).and_then(MetricValue::as_f64).unwrap_or(0.0)
    }

    pub fn coins_received(&self) -> f64 {
        self.value(COINS_RECEIVED)
    }

    pub fn coins_sent(&self) -> f64 {
        self.value(COINS_SENT)
    }

    pub fn coins_filtered(&self) -> f64 {
        self.value(COINS_FILTERED)
    }

    pub fn batches_sent(&self) -> f64 {
        self.value(BATCHES_SENT)
    }

    pub fn ws_connected(&self) -> bool {
        self.value(WS_CONNECTED) == 1.0
    }

    pub fn n8n_available(&self) -> bool {
        self.value(N8N_AVAILABLE) == 1.0
    }

    pub fn buffer_size(&self) -> f64 {
        self.value(BUFFER_SIZE)
    }

    pub fn ws_reconnects(&self) -> f64 {
        self.value(WS_RECONNECTS)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_exposition() {
        let metrics = parse_metrics("pumpfun_coins_received_total 42\n# comment\npumpfun_ws_connected 1");
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[COINS_RECEIVED], MetricValue::Integer(42));
        assert_eq!(metrics[WS_CONNECTED], MetricValue::Integer(1));
    }

    #[test]
    fn test_value_kinds() {
        let text = "\
# HELP pumpfun_buffer_size Coins waiting
# TYPE pumpfun_buffer_size gauge
pumpfun_buffer_size 3.0
process_start_time_seconds 1.7e9
scientific_without_point 1e3
histogram_bucket{le=\"+Inf\"} +Inf
weird_metric abc
lonely_name
pumpfun_sample 5 1700000000000
";
        let metrics = parse_metrics(text);
        assert_eq!(metrics["pumpfun_buffer_size"], MetricValue::Float(3.0));
        assert_eq!(metrics["process_start_time_seconds"], MetricValue::Float(1.7e9));
        // No decimal point: integer parse fails, raw string kept
        assert_eq!(metrics["scientific_without_point"], MetricValue::Raw("1e3".into()));
        assert_eq!(metrics["histogram_bucket{le=\"+Inf\"}"], MetricValue::Raw("+Inf".into()));
        assert_eq!(metrics["weird_metric"], MetricValue::Raw("abc".into()));
        assert!(!metrics.contains_key("lonely_name"));
        // Timestamps after the value are ignored
        assert_eq!(metrics["pumpfun_sample"], MetricValue::Integer(5));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let metrics = parse_metrics("a 1\na 2\n");
        assert_eq!(metrics["a"], MetricValue::Integer(2));
    }

    #[test]
    fn test_snapshot_accessors() {
        let snapshot = MetricsSnapshot::parse("pumpfun_ws_connected 1\npumpfun_coins_sent_total 9\npumpfun_n8n_available 0\n");
        assert!(snapshot.ws_connected());
        assert!(!snapshot.n8n_available());
        assert_eq!(snapshot.coins_sent(), 9.0);
        assert_eq!(snapshot.coins_filtered(), 0.0);
    }
}
