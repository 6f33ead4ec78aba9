//! Relay lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Apply (controller.rs):
//!     managed → relay reload endpoint → Reloaded | ReloadFailed
//!     direct  → docker.rs: ping → resolve container → stop → start
//!             → runtime unreachable: compose.rs restart in project dir
//!             → Restarted | RestartFailed
//!
//! Logs (logs.rs):
//!     managed → relay logs endpoint
//!     direct  → docker.rs container logs, else compose.rs logs --tail
//!     → newest line first
//! ```
//!
//! # Design Decisions
//! - Drivers sit behind the `ContainerRuntime` and `Supervisor` traits
//! - Container names are resolved by one ordered chain shared by restart
//!   and logs
//! - No automatic retries; the operator re-runs the action

pub mod compose;
pub mod controller;
pub mod docker;
pub mod logs;
pub mod types;

pub use compose::{CliCommand, ComposeCli};
pub use controller::{ControlState, ServiceController};
pub use docker::DockerEngine;
pub use logs::{newest_first, LogRetriever};
pub use types::{ContainerInfo, ContainerRuntime, LifecycleError, LifecycleResult, Supervisor};

use crate::resilience::first_success_async;

/// Resolve the relay container by trying each candidate name in order.
///
/// Fails with `RuntimeUnavailable` when the runtime cannot be reached, and
/// with `ContainerNotFound` naming every candidate when none resolve.
pub async fn resolve_container(runtime: &dyn ContainerRuntime, candidates: &[String]) -> LifecycleResult<ContainerInfo> {
    runtime.ping().await?;

    match first_success_async(candidates.iter().cloned(), |name| async move { runtime.inspect(&name).await }).await {
        Ok((name, container)) => {
            tracing::debug!(candidate = %name, id = %container.id, "Resolved relay container");
            Ok(container)
        }
        Err(exhausted) => {
            tracing::warn!(attempts = %exhausted, "No relay container resolved");
            // Report a non-404 failure (daemon gone, API error) over "not found"
            let mut attempts = exhausted.attempts;
            match attempts.iter().position(|a| !a.error.is_not_found()) {
                Some(index) => Err(attempts.swap_remove(index).error),
                None => Err(LifecycleError::ContainerNotFound {
                    candidates: attempts.into_iter().map(|a| a.candidate).collect(),
                }),
            }
        }
    }
}
