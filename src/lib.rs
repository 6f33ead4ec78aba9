//! Operator console for the pump-discover relay.

pub mod config;
pub mod console;
pub mod database;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod resilience;

pub use config::{ConsoleSettings, EnvironmentMode, RelayConfig};
pub use console::{Console, ConsoleError};
pub use lifecycle::ControlState;
