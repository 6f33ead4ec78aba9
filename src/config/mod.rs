//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! Relay configuration (what the operator edits):
//!     structured document (TOML, authoritative)
//!     → store.rs (load, fill defaults, fall back to env files)
//!     → RelayConfig (flat key → value mapping, always complete)
//!     → validation.rs (checked by the caller before saving)
//!     → store.rs save: document first, then envfile.rs propagation
//!
//! Console settings (how the console itself runs):
//!     settings file (optional) + environment
//!     → loader.rs (parse, override, validate)
//!     → ConsoleSettings (immutable, injected into every component)
//! ```
//!
//! # Design Decisions
//! - The structured document wins over env files whenever it has content
//! - Env file writes are best-effort and reported, never swallowed
//! - Validation separates syntactic (serde) from semantic checks

pub mod envfile;
pub mod loader;
pub mod schema;
pub mod settings;
pub mod store;
pub mod validation;

pub use loader::{load_settings, SettingsError};
pub use schema::{ConfigValue, RelayConfig};
pub use settings::{ConsoleSettings, EnvironmentMode, TimeoutSettings};
pub use store::{ConfigError, ConfigSource, ConfigStore, PropagationWarning, SaveReport};
pub use validation::{validate_config, validate_port, validate_regex, validate_url, FieldError, ValidationError};
