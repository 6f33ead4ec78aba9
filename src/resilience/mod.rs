//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Boundary call (relay API, Docker API, CLI, database):
//!     → timeouts.rs (enforce a deadline on the call)
//!     → On failure: fallback.rs (move on to the next candidate, if any)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No automatic retries; re-running an action is the operator's decision
//! - Candidate chains are explicit ordered lists, never scattered loops

pub mod fallback;
pub mod timeouts;

pub use fallback::{first_success, first_success_async, Attempt, Exhausted};
pub use timeouts::with_deadline;
