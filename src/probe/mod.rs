//! Relay probing subsystem.
//!
//! # Data Flow
//! ```text
//! Operator action (status, metrics, reload, logs)
//!     → client.rs (HTTP call with deadline)
//!     → types.rs (HealthSnapshot / ProbeError)
//!     → metrics.rs (exposition text → MetricsSnapshot)
//! ```
//!
//! # Design Decisions
//! - Snapshots are fetched per request and never cached
//! - Unreachable relay degrades to an "unreachable" state, never a crash

pub mod client;
pub mod metrics;
pub mod types;

pub use client::RelayClient;
pub use metrics::{parse_metrics, MetricValue, MetricsSnapshot};
pub use types::{HealthSnapshot, ProbeError, ProbeResult};
