//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap boundary calls (Docker API, CLI processes, database) with a deadline
//! - Turn an elapsed deadline into the caller's own error type
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Dropping the timed-out future cancels the call; nothing is left pending

use std::future::Future;
use std::time::Duration;

/// Run `fut` with a deadline. When it elapses, `on_timeout` builds the error.
pub async fn with_deadline<T, E, F, G>(limit: Duration, fut: F, on_timeout: G) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    G: FnOnce() -> E,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_secs = limit.as_secs_f64(), "Deadline elapsed");
            Err(on_timeout())
        }
    }
}
