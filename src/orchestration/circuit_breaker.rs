//! # Quota Circuit Breaker
//!
//! Run-wide latch that records permanent quota exhaustion.
//!
//! Unlike a classical three-state breaker there is no recovery path: a
//! provider quota does not replenish within a run, so once the breaker
//! opens every remaining job is skipped without contacting the engine.
//! A new run constructs a new breaker, closed.
//!
//! State lives in an atomic and the trip reason in a write-once cell, so
//! a future parallel scheduler can share one breaker across workers
//! without locks.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use tracing::warn;

/// Breaker state: closed (normal) or open (tripped for the run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            _ => CircuitState::Open,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
        }
    }
}

/// One-way `Closed -> Open` latch, one instance per run.
#[derive(Debug, Default)]
pub struct QuotaCircuitBreaker {
    state: AtomicU8,
    trip_reason: OnceLock<String>,
}

impl QuotaCircuitBreaker {
    /// Create a closed breaker for a new run.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(CircuitState::Closed as u8),
            trip_reason: OnceLock::new(),
        }
    }

    /// Trip the breaker. Idempotent; returns `true` only for the call
    /// that performed the `Closed -> Open` transition.
    pub fn trip(&self, reason: &str) -> bool {
        let transitioned = self
            .state
            .compare_exchange(
                CircuitState::Closed as u8,
                CircuitState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if transitioned {
            let _ = self.trip_reason.set(reason.to_string());
            warn!(
                reason = %reason,
                "🔴 CIRCUIT BREAKER: quota exhausted, no further engine calls this run"
            );
        }

        transitioned
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// The message that tripped the breaker, if it tripped.
    pub fn trip_reason(&self) -> Option<&str> {
        self.trip_reason.get().map(String::as_str)
    }
}
