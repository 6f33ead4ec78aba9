//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Honour `RUST_LOG`, falling back to the console's default filter
//!
//! # Design Decisions
//! - Uses the tracing crate for structured events
//! - Events go to stderr so command output on stdout stays clean

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "relay_console=info";

/// Build the filter from `RUST_LOG` or `default`.
pub fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. `verbose` raises the default to debug.
pub fn init(verbose: bool) {
    let default = if verbose { "relay_console=debug" } else { DEFAULT_FILTER };

    let installed = tracing_subscriber::registry()
        .with(filter_or(default))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
