//! # Orchestration Engine
//!
//! The job-batch orchestration core: everything between an ordered job
//! list and a finished `RunResult`.
//!
//! ## Core Components
//!
//! - **BatchScheduler**: drives each job through the analysis engine
//!   with batching, pacing, retries, and cancellation
//! - **ErrorClassifier**: maps raw engine failure text to a
//!   `FailureKind`
//! - **RetryPolicy**: pure retry/backoff decisions; the scheduler owns
//!   the actual waiting
//! - **QuotaCircuitBreaker**: run-wide latch that stops engine traffic
//!   once the provider quota is exhausted
//! - **ResultAggregator**: folds a `RunResult` into run statistics for
//!   reports and notifications
//!
//! ## Failure Policy
//!
//! ```text
//! Transient / Unknown  retry, base * 2^attempt backoff
//! RateLimited          retry, base * 5 * 2^attempt backoff
//! QuotaExceeded        no retry; breaker opens; remaining jobs skipped
//! ```
//!
//! Per-job failures never abort a run: they become `JobOutcome` entries
//! and the run always completes with a full `RunResult`.

pub mod aggregator;
pub mod circuit_breaker;
pub mod error_classifier;
pub mod retry_policy;
pub mod scheduler;
pub mod types;

// Re-export core types and components for easy access
pub use aggregator::{RankedJob, ResultAggregator, RunSummary, TOP_PRICE_RANGES};
pub use circuit_breaker::{CircuitState, QuotaCircuitBreaker};
pub use error_classifier::{ErrorClassifier, FailureKind};
pub use retry_policy::{RetryDecision, RetryPolicy, RATE_LIMIT_BACKOFF_FACTOR};
pub use scheduler::{BatchScheduler, CancellationSignal};
pub use types::{
    AnalysisPayload, AttemptOutcome, AttemptRecord, Job, JobOutcome, JobReport, MarketCategory,
    OrchestrationEvent, RunResult, SKIP_REASON_CANCELLED, SKIP_REASON_CIRCUIT_OPEN,
};
