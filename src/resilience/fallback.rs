//! Ordered candidate fallback.
//!
//! # Responsibilities
//! - Try each candidate (path, container name, CLI binary) in order
//! - Keep the first success, record every failure on the way
//!
//! # Design Decisions
//! - One helper for every chain in the crate, so candidate order is data
//! - Exhaustion keeps all attempts for the operator-facing message

use std::fmt;
use std::future::Future;

/// A single failed attempt in a fallback chain.
#[derive(Debug)]
pub struct Attempt<C, E> {
    pub candidate: C,
    pub error: E,
}

/// Every candidate failed (or there were none).
#[derive(Debug)]
pub struct Exhausted<C, E> {
    pub attempts: Vec<Attempt<C, E>>,
}

impl<C, E> Exhausted<C, E> {
    /// True when the chain had no candidates at all.
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn candidates(&self) -> impl Iterator<Item = &C> {
        self.attempts.iter().map(|a| &a.candidate)
    }
}

impl<C: fmt::Display, E: fmt::Display> fmt::Display for Exhausted<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return write!(f, "no candidates configured");
        }
        for (i, attempt) in self.attempts.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", attempt.candidate, attempt.error)?;
        }
        Ok(())
    }
}

/// Try `attempt` on each candidate in order and return the first success
/// together with the candidate that produced it.
pub fn first_success<C, T, E, I, F>(candidates: I, mut attempt: F) -> Result<(C, T), Exhausted<C, E>>
where
    I: IntoIterator<Item = C>,
    F: FnMut(&C) -> Result<T, E>,
{
    let mut attempts = Vec::new();
    for candidate in candidates {
        match attempt(&candidate) {
            Ok(value) => return Ok((candidate, value)),
            Err(error) => attempts.push(Attempt { candidate, error }),
        }
    }
    Err(Exhausted { attempts })
}

/// Async variant of [`first_success`]. Candidates are cloned into each
/// attempt so the future does not borrow the chain.
pub async fn first_success_async<C, T, E, I, F, Fut>(
    candidates: I,
    mut attempt: F,
) -> Result<(C, T), Exhausted<C, E>>
where
    C: Clone,
    I: IntoIterator<Item = C>,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = Vec::new();
    for candidate in candidates {
        match attempt(candidate.clone()).await {
            Ok(value) => return Ok((candidate, value)),
            Err(error) => attempts.push(Attempt { candidate, error }),
        }
    }
    Err(Exhausted { attempts })
}
