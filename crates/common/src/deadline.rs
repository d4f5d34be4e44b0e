//! Per-request deadlines that travel across service boundaries.
//!
//! The gateway starts a [`Deadline`] when a request arrives and forwards the
//! remaining budget to downstream services in the
//! [`REQUEST_TIMEOUT_HEADER`] header. Each service rebuilds its own deadline
//! from that header, capped by its configured maximum, and bounds every
//! remote call by `min(per-call timeout, remaining)`.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Header carrying the remaining request budget in milliseconds.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request deadline exceeded")]
pub struct DeadlineExceeded;

/// Absolute point in time by which a request must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    /// Build a deadline from an incoming header value.
    ///
    /// A missing or unparseable header falls back to `max`; a larger value
    /// is capped at `max` so a caller cannot extend this service's budget.
    #[must_use]
    pub fn from_header(value: Option<&str>, max: Duration) -> Self {
        let budget = value
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(max, |ms| Duration::from_millis(ms).min(max));
        Self::after(budget)
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Timeout for a single remote call: the smaller of `per_call` and what
    /// is left of the request.
    #[must_use]
    pub fn budget(&self, per_call: Duration) -> Duration {
        per_call.min(self.remaining())
    }

    /// Value to forward in [`REQUEST_TIMEOUT_HEADER`].
    #[must_use]
    pub fn header_value(&self) -> String {
        self.remaining().as_millis().to_string()
    }

    /// Run `fut` bounded by [`Deadline::budget`].
    ///
    /// # Errors
    ///
    /// Returns [`DeadlineExceeded`] if the deadline has already passed or
    /// the future does not complete within the budget. The future is dropped
    /// on timeout.
    pub async fn run<F>(&self, per_call: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        if self.is_expired() {
            return Err(DeadlineExceeded);
        }
        tokio::time::timeout(self.budget(per_call), fut)
            .await
            .map_err(|_| DeadlineExceeded)
    }
}
