//! # Retry Policy
//!
//! Pure retry/backoff decisions for failed analysis attempts.
//!
//! The policy computes whether a failed attempt should be retried and how
//! long to wait first; it never sleeps. The scheduler owns the actual
//! suspension, which keeps this component testable without elapsed time
//! and keeps every wait in the run loop cancellable in one place.
//!
//! Delay schedule, with `base = delay_between_requests`:
//!
//! ```text
//! Transient / Unknown   base * 2^attempt
//! RateLimited           base * 5 * 2^attempt
//! QuotaExceeded         never retried (breaker trips instead)
//! ```

use std::time::Duration;

use super::error_classifier::FailureKind;

/// Extended-backoff factor applied to rate-limited failures, so the run
/// backs off materially further than the provider's throttle window.
pub const RATE_LIMIT_BACKOFF_FACTOR: f64 = 5.0;

/// Outcome of a retry decision for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryDecision {
    /// Whether the job gets another attempt
    pub retry: bool,
    /// Delay to await before that attempt (zero when `retry` is false)
    pub delay: Duration,
}

impl RetryDecision {
    fn give_up() -> Self {
        Self {
            retry: false,
            delay: Duration::ZERO,
        }
    }
}

/// Computes retry eligibility and backoff delays from run configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Total attempts allowed per job; the first try is attempt 0.
    /// Saturates, so a `u32::MAX` retry budget stays well-defined.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff delay after a failure of `kind` on attempt `attempt`.
    ///
    /// Pure formula, no eligibility check; `QuotaExceeded` yields zero
    /// because it is never awaited.
    pub fn backoff_delay(&self, attempt: u32, kind: FailureKind) -> Duration {
        let factor = match kind {
            FailureKind::Transient | FailureKind::Unknown => 1.0,
            FailureKind::RateLimited => RATE_LIMIT_BACKOFF_FACTOR,
            FailureKind::QuotaExceeded => return Duration::ZERO,
        };

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * factor * 2f64.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Decide whether attempt `attempt` (which just failed with `kind`)
    /// earns another attempt, and the delay to wait first.
    pub fn evaluate(&self, attempt: u32, kind: FailureKind) -> RetryDecision {
        if !kind.is_retryable() {
            return RetryDecision::give_up();
        }
        if attempt.saturating_add(1) >= self.max_attempts() {
            return RetryDecision::give_up();
        }

        RetryDecision {
            retry: true,
            delay: self.backoff_delay(attempt, kind),
        }
    }
}
