//! Caller-supplied deadlines for storage calls.

use std::time::{Duration, Instant};

use super::error::{ErrorContext, RepositoryError, RepositoryResult};

/// Point in time after which a storage operation must not start mutating.
///
/// Writes check the deadline inside their critical section (or transaction)
/// right before committing, so an operation that reports a timeout never
/// leaves a partial or late write behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn has_expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Fail with a retryable timeout error if the deadline has passed.
    pub fn check(&self, operation: &str) -> RepositoryResult<()> {
        if self.has_expired() {
            return Err(RepositoryError::timeout_with_context(
                "deadline exceeded before commit",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }
}

impl From<Deadline> for tokio::time::Instant {
    fn from(deadline: Deadline) -> Self {
        tokio::time::Instant::from_std(deadline.0)
    }
}
