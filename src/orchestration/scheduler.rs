//! # Batch Scheduler
//!
//! Owns a batch run from job list to `RunResult`: batching, pacing,
//! per-job retries, quota circuit breaking, and cancellation.
//!
//! ## Overview
//!
//! Jobs are processed by a single sequential worker. `max_concurrent`
//! sets the batch *grouping size* for pacing purposes, not a parallelism
//! level: the shared provider rate limit applies to the whole process, so
//! jobs inside a batch run one at a time with an inter-job wait, and
//! batches are separated by a longer inter-batch wait.
//!
//! ```text
//! ┌─────────┐  per job   ┌────────────────┐  failure   ┌─────────────────┐
//! │  batch  │───────────▶│ AnalysisEngine │───────────▶│ ErrorClassifier │
//! │  loop   │◀───────────│    attempt     │            └────────┬────────┘
//! └────┬────┘  backoff   └────────────────┘                     │ kind
//!      │       (RetryPolicy decides, scheduler awaits)          ▼
//!      │                                              QuotaExceeded trips
//!      └── breaker open / cancelled ──▶ remaining     QuotaCircuitBreaker
//!          jobs finalized Skipped
//! ```
//!
//! ## Guarantees
//!
//! - `RunResult` reports appear in input order, regardless of retries.
//! - Every job gets exactly one outcome; the run never fails as a whole.
//! - Once the breaker opens, no further engine calls are made and all
//!   pacing waits are skipped.
//! - Cancellation is observed before every engine call and at every
//!   suspension point; remaining jobs finalize `Skipped("cancelled")`.
//!
//! A scheduler instance is built fresh per run; nothing carries over
//! between runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::sync::broadcast;
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::circuit_breaker::QuotaCircuitBreaker;
use super::error_classifier::{ErrorClassifier, FailureKind};
use super::retry_policy::RetryPolicy;
use super::types::{
    AttemptOutcome, AttemptRecord, Job, JobOutcome, JobReport, OrchestrationEvent, RunResult,
    SKIP_REASON_CANCELLED, SKIP_REASON_CIRCUIT_OPEN,
};
use crate::config::BatchConfig;
use crate::engine::AnalysisEngine;
use crate::events::EventPublisher;

/// Cloneable cancellation handle for a run.
///
/// `cancel` is sticky: once fired, every current and future wait on the
/// signal completes immediately.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<CancellationInner>,
}

#[derive(Debug, Default)]
struct CancellationInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Completes once `cancel` has been called; immediately if it
    /// already was.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register the waiter before re-checking the flag so a cancel
        // landing in between cannot be missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Drives one batch run against the analysis engine.
pub struct BatchScheduler {
    engine: Arc<dyn AnalysisEngine>,
    config: BatchConfig,
    classifier: ErrorClassifier,
    retry_policy: RetryPolicy,
    breaker: Arc<QuotaCircuitBreaker>,
    events: EventPublisher,
    cancellation: CancellationSignal,
}

impl BatchScheduler {
    /// Create a scheduler for one run.
    pub fn new(engine: Arc<dyn AnalysisEngine>, config: BatchConfig) -> Self {
        let retry_policy = RetryPolicy::new(config.max_retries, config.delay_between_requests());
        Self {
            engine,
            retry_policy,
            classifier: ErrorClassifier::new(),
            breaker: Arc::new(QuotaCircuitBreaker::new()),
            events: EventPublisher::default(),
            cancellation: CancellationSignal::new(),
            config,
        }
    }

    /// Use an externally constructed event publisher.
    pub fn with_event_publisher(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }

    /// Handle for cancelling this run from another task.
    pub fn cancellation_signal(&self) -> CancellationSignal {
        self.cancellation.clone()
    }

    /// This run's circuit breaker.
    pub fn breaker(&self) -> Arc<QuotaCircuitBreaker> {
        Arc::clone(&self.breaker)
    }

    /// Subscribe to this run's lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.events.subscribe()
    }

    /// Drive every job to a terminal outcome.
    ///
    /// Never returns an error: per-job failures, quota trips, and
    /// cancellation are all represented as data in the `RunResult`.
    #[instrument(skip(self, jobs), fields(engine = self.engine.name(), total_jobs = jobs.len()))]
    pub async fn run(&self, jobs: Vec<Job>, analysis_date: NaiveDate) -> RunResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = jobs.len();

        info!(
            run_id = %run_id,
            total_jobs = total,
            analysis_date = %analysis_date,
            max_concurrent = self.config.max_concurrent,
            "🚀 BATCH RUN: starting"
        );
        let _ = self.events.publish(OrchestrationEvent::RunStarted {
            run_id,
            total_jobs: total,
        });

        let mut reports: Vec<JobReport> = Vec::with_capacity(total);

        if total > 0 {
            let batch_size = self.config.max_concurrent.clamp(1, total);
            let batch_count = total.div_ceil(batch_size);

            for (batch_index, batch) in jobs.chunks(batch_size).enumerate() {
                debug!(
                    batch = batch_index + 1,
                    batches = batch_count,
                    batch_size = batch.len(),
                    "📦 BATCH: starting"
                );

                for (position, job) in batch.iter().enumerate() {
                    let report = if self.halted() {
                        self.skip_job(job)
                    } else {
                        self.run_job(job, analysis_date).await
                    };

                    let _ = self.events.publish(OrchestrationEvent::JobFinalized {
                        symbol: job.symbol.clone(),
                        outcome: report.outcome.clone(),
                        attempts: report.attempts,
                    });
                    reports.push(report);

                    let last_in_batch = position + 1 == batch.len();
                    if !last_in_batch && !self.halted() {
                        let delay = self.config.delay_between_requests();
                        debug!(delay_secs = delay.as_secs_f64(), "⏸️ PACING: inter-job wait");
                        self.wait(delay).await;
                    }
                }

                let last_batch = batch_index + 1 == batch_count;
                if !last_batch && !self.halted() {
                    let delay = self.config.batch_delay();
                    debug!(delay_secs = delay.as_secs_f64(), "⏸️ PACING: inter-batch wait");
                    self.wait(delay).await;
                }
            }
        }

        let completed_at = Utc::now();
        let result = RunResult::new(
            run_id,
            analysis_date,
            started_at,
            completed_at,
            reports,
            self.breaker.is_open(),
            self.breaker.trip_reason().map(str::to_string),
        );

        info!(
            run_id = %run_id,
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            duration_secs = result.duration().as_secs_f64(),
            breaker_tripped = result.breaker_tripped,
            "🏁 BATCH RUN: finished"
        );
        let _ = self.events.publish(OrchestrationEvent::RunCompleted {
            run_id,
            succeeded: result.succeeded,
            failed: result.failed,
            skipped: result.skipped,
        });

        result
    }

    /// Drive one job through up to `max_attempts` engine calls.
    async fn run_job(&self, job: &Job, analysis_date: NaiveDate) -> JobReport {
        let mut attempt: u32 = 0;
        let mut waited_before = Duration::ZERO;

        loop {
            if self.cancellation.is_cancelled() {
                debug!(symbol = %job.symbol, "⏭️ JOB: cancelled before attempt");
                return JobReport {
                    job: job.clone(),
                    outcome: JobOutcome::skipped(SKIP_REASON_CANCELLED),
                    attempts: attempt,
                };
            }

            debug!(symbol = %job.symbol, attempt, "🔍 JOB: engine attempt");
            match self.engine.analyze(job, analysis_date).await {
                Ok(payload) => {
                    let _ = self.events.publish(OrchestrationEvent::AttemptFinished(
                        AttemptRecord {
                            symbol: job.symbol.clone(),
                            attempt,
                            waited_before,
                            outcome: AttemptOutcome::Succeeded,
                        },
                    ));
                    info!(
                        symbol = %job.symbol,
                        attempts = attempt + 1,
                        "✅ JOB: analysis succeeded"
                    );
                    return JobReport {
                        job: job.clone(),
                        outcome: JobOutcome::Success(payload),
                        attempts: attempt + 1,
                    };
                }
                Err(failure) => {
                    let kind = self.classifier.classify(failure.message());
                    warn!(
                        symbol = %job.symbol,
                        attempt,
                        kind = %kind,
                        error = %failure,
                        "⚠️ JOB: attempt failed"
                    );
                    let _ = self.events.publish(OrchestrationEvent::AttemptFinished(
                        AttemptRecord {
                            symbol: job.symbol.clone(),
                            attempt,
                            waited_before,
                            outcome: AttemptOutcome::Failed(kind),
                        },
                    ));

                    if kind == FailureKind::QuotaExceeded {
                        if self.config.stop_on_quota_exceeded {
                            if self.breaker.trip(failure.message()) {
                                let _ =
                                    self.events.publish(OrchestrationEvent::BreakerTripped {
                                        reason: failure.message().to_string(),
                                    });
                            }
                        } else {
                            warn!(
                                symbol = %job.symbol,
                                "🟡 QUOTA: exceeded but stop_on_quota_exceeded is off, run continues"
                            );
                        }
                        return JobReport {
                            job: job.clone(),
                            outcome: JobOutcome::failed(kind, failure.message()),
                            attempts: attempt + 1,
                        };
                    }

                    let decision = self.retry_policy.evaluate(attempt, kind);
                    if !decision.retry {
                        info!(
                            symbol = %job.symbol,
                            attempts = attempt + 1,
                            kind = %kind,
                            "❌ JOB: retries exhausted"
                        );
                        return JobReport {
                            job: job.clone(),
                            outcome: JobOutcome::failed(kind, failure.message()),
                            attempts: attempt + 1,
                        };
                    }

                    info!(
                        symbol = %job.symbol,
                        attempt,
                        kind = %kind,
                        delay_secs = decision.delay.as_secs_f64(),
                        "🔁 JOB: retrying after backoff"
                    );
                    self.wait(decision.delay).await;
                    waited_before = decision.delay;
                    attempt += 1;
                }
            }
        }
    }

    /// Finalize a job without contacting the engine.
    fn skip_job(&self, job: &Job) -> JobReport {
        let reason = if self.breaker.is_open() {
            SKIP_REASON_CIRCUIT_OPEN
        } else {
            SKIP_REASON_CANCELLED
        };
        debug!(symbol = %job.symbol, reason, "⏭️ JOB: skipped");
        JobReport {
            job: job.clone(),
            outcome: JobOutcome::skipped(reason),
            attempts: 0,
        }
    }

    fn halted(&self) -> bool {
        self.breaker.is_open() || self.cancellation.is_cancelled()
    }

    /// Cancellable suspension point.
    async fn wait(&self, delay: Duration) {
        if delay.is_zero() || self.cancellation.is_cancelled() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancellation.cancelled() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ScriptedEngine, ScriptedResponse};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    fn test_config() -> BatchConfig {
        BatchConfig {
            max_concurrent: 2,
            delay_between_requests: 0.01,
            max_retries: 2,
            batch_delay_multiplier: 1.0,
            stop_on_quota_exceeded: true,
        }
    }

    fn jobs(symbols: &[&str]) -> Vec<Job> {
        symbols.iter().map(|&s| Job::new(s)).collect()
    }

    #[tokio::test]
    async fn test_all_jobs_succeed_in_input_order() {
        let engine = Arc::new(ScriptedEngine::new());
        let scheduler = BatchScheduler::new(engine.clone(), test_config());

        let result = scheduler
            .run(jobs(&["AAPL", "MSFT", "TSLA"]), date())
            .await;

        assert_eq!(result.total_jobs(), 3);
        assert_eq!(result.succeeded, 3);
        assert_eq!(result.failed, 0);
        assert_eq!(result.skipped, 0);
        assert!(!result.breaker_tripped);

        let order: Vec<&str> = result
            .reports
            .iter()
            .map(|r| r.job.symbol.as_str())
            .collect();
        assert_eq!(order, vec!["AAPL", "MSFT", "TSLA"]);
        for report in &result.reports {
            assert_eq!(report.attempts, 1);
        }
    }

    #[tokio::test]
    async fn test_transient_failure_retried_then_succeeds() {
        let engine = Arc::new(ScriptedEngine::new().with_responses(
            "AAPL",
            vec![
                ScriptedResponse::fail("connection reset by peer"),
                ScriptedResponse::ok(),
            ],
        ));
        let scheduler = BatchScheduler::new(engine.clone(), test_config());
        let mut events = scheduler.subscribe();

        let result = scheduler.run(jobs(&["AAPL"]), date()).await;

        assert_eq!(result.succeeded, 1);
        assert_eq!(result.reports[0].attempts, 2);
        assert_eq!(engine.calls_for("AAPL"), 2);

        // Attempt records: failed attempt 0 with no prior wait, then the
        // successful attempt 1 after one standard backoff.
        let mut records = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let OrchestrationEvent::AttemptFinished(record) = event {
                records.push(record);
            }
        }
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].attempt, 0);
        assert_eq!(records[0].waited_before, Duration::ZERO);
        assert_eq!(
            records[0].outcome,
            AttemptOutcome::Failed(FailureKind::Transient)
        );
        assert_eq!(records[1].attempt, 1);
        assert_eq!(
            records[1].waited_before,
            RetryPolicy::new(2, Duration::from_secs_f64(0.01))
                .backoff_delay(0, FailureKind::Transient)
        );
        assert_eq!(records[1].outcome, AttemptOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_persistent_transient_exhausts_attempts() {
        let engine =
            Arc::new(ScriptedEngine::new().with_persistent_failure("AAPL", "read timed out"));
        let config = test_config();
        let scheduler = BatchScheduler::new(engine.clone(), config);

        let result = scheduler.run(jobs(&["AAPL"]), date()).await;

        // max_retries = 2, so exactly 3 attempts.
        assert_eq!(result.reports[0].attempts, 3);
        assert_eq!(engine.calls_for("AAPL"), 3);
        match &result.reports[0].outcome {
            JobOutcome::Failed { kind, message } => {
                assert_eq!(*kind, FailureKind::Transient);
                assert!(message.contains("timed out"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_failure_retried_like_transient() {
        let engine = Arc::new(
            ScriptedEngine::new().with_persistent_failure("AAPL", "model output was gibberish"),
        );
        let scheduler = BatchScheduler::new(engine.clone(), test_config());

        let result = scheduler.run(jobs(&["AAPL"]), date()).await;

        assert_eq!(result.reports[0].attempts, 3);
        match &result.reports[0].outcome {
            JobOutcome::Failed { kind, .. } => assert_eq!(*kind, FailureKind::Unknown),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quota_failure_trips_breaker_and_skips_rest() {
        let engine = Arc::new(ScriptedEngine::new().with_persistent_failure(
            "TSLA",
            "Error: You exceeded your current quota (free_tier_requests, limit: 200)",
        ));
        let scheduler = BatchScheduler::new(engine.clone(), test_config());

        let result = scheduler
            .run(jobs(&["AAPL", "MSFT", "TSLA", "NVDA", "AMZN"]), date())
            .await;

        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 2);
        assert!(result.breaker_tripped);
        assert!(result
            .breaker_reason
            .as_deref()
            .unwrap()
            .contains("exceeded your current quota"));

        // The quota job was attempted exactly once, never retried.
        assert_eq!(result.reports[2].attempts, 1);
        assert_eq!(engine.calls_for("TSLA"), 1);
        match &result.reports[2].outcome {
            JobOutcome::Failed { kind, .. } => assert_eq!(*kind, FailureKind::QuotaExceeded),
            other => panic!("expected quota failure, got {other:?}"),
        }

        // Jobs after the trip never reached the engine.
        for symbol in ["NVDA", "AMZN"] {
            assert_eq!(engine.calls_for(symbol), 0);
        }
        for report in &result.reports[3..] {
            assert_eq!(report.attempts, 0);
            assert_eq!(
                report.outcome,
                JobOutcome::skipped(SKIP_REASON_CIRCUIT_OPEN)
            );
        }
        assert!(scheduler.breaker().is_open());
    }

    #[tokio::test]
    async fn test_quota_without_stop_flag_keeps_running() {
        let engine = Arc::new(
            ScriptedEngine::new().with_persistent_failure("MSFT", "quota exceeded for project"),
        );
        let mut config = test_config();
        config.stop_on_quota_exceeded = false;
        let scheduler = BatchScheduler::new(engine.clone(), config);

        let result = scheduler.run(jobs(&["AAPL", "MSFT", "TSLA"]), date()).await;

        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 0);
        assert!(!result.breaker_tripped);
        // The quota job itself is still never retried.
        assert_eq!(engine.calls_for("MSFT"), 1);
        assert_eq!(engine.calls_for("TSLA"), 1);
    }

    #[tokio::test]
    async fn test_cancellation_skips_remaining_jobs() {
        // First job retries with a long backoff; cancel during that wait.
        let mut config = test_config();
        config.delay_between_requests = 5.0;
        let engine = Arc::new(
            ScriptedEngine::new().with_persistent_failure("AAPL", "connection refused"),
        );
        let scheduler = BatchScheduler::new(engine.clone(), config);
        let signal = scheduler.cancellation_signal();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            signal.cancel();
        });

        let started = std::time::Instant::now();
        let result = scheduler.run(jobs(&["AAPL", "MSFT"]), date()).await;
        canceller.await.unwrap();

        // The run returned well before the 5s backoff elapsed.
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(result.skipped, 2);
        assert_eq!(
            result.reports[0].outcome,
            JobOutcome::skipped(SKIP_REASON_CANCELLED)
        );
        assert_eq!(result.reports[0].attempts, 1);
        assert_eq!(
            result.reports[1].outcome,
            JobOutcome::skipped(SKIP_REASON_CANCELLED)
        );
        assert_eq!(engine.calls_for("MSFT"), 0);
    }

    #[tokio::test]
    async fn test_empty_job_list_completes_immediately() {
        let engine = Arc::new(ScriptedEngine::new());
        let scheduler = BatchScheduler::new(engine, test_config());
        let result = scheduler.run(Vec::new(), date()).await;
        assert_eq!(result.total_jobs(), 0);
        assert_eq!(result.attempted, 0);
        assert!(!result.breaker_tripped);
    }

    #[tokio::test]
    async fn test_batch_size_caps_at_job_count() {
        let mut config = test_config();
        config.max_concurrent = 10;
        let engine = Arc::new(ScriptedEngine::new());
        let scheduler = BatchScheduler::new(engine, config);
        let result = scheduler.run(jobs(&["AAPL", "MSFT"]), date()).await;
        assert_eq!(result.succeeded, 2);
    }

    #[tokio::test]
    async fn test_cancellation_signal_is_sticky() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());
        signal.cancel();
        assert!(signal.is_cancelled());
        // Completes immediately when already cancelled.
        signal.cancelled().await;
    }

    #[tokio::test]
    async fn test_cancellation_wakes_pending_wait() {
        let signal = CancellationSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake after cancel")
            .unwrap();
    }
}
