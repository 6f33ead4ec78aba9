//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems emit tracing events:
//!     fallback decisions, state transitions, boundary failures
//!     → logging.rs (EnvFilter → fmt layer → stderr)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (path, container, command, url)
//! - Human-facing output (status, logs, config) goes to stdout, never
//!   through tracing

pub mod logging;

pub use logging::init;
