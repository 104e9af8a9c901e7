//! # Orchestration Types
//!
//! Core data types shared across the orchestration components: jobs and
//! their market categories, per-job outcomes, and the run-level result
//! record handed to the aggregator and renderer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::error_classifier::FailureKind;

/// Skip reason recorded when the quota circuit breaker pre-empts a job.
pub const SKIP_REASON_CIRCUIT_OPEN: &str = "circuit open";

/// Skip reason recorded when a cancellation signal pre-empts a job.
pub const SKIP_REASON_CANCELLED: &str = "cancelled";

/// Market segment a job's symbol belongs to, detected once at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCategory {
    /// US equity ticker (1-5 uppercase letters, e.g. `AAPL`)
    UsEquity,
    /// Mainland China A-share code (6 digits, e.g. `600519`)
    AShare,
    /// Hong Kong listing (4-5 digits, optionally suffixed `.HK`)
    HkEquity,
}

impl MarketCategory {
    /// Detect the market category from the shape of a symbol.
    ///
    /// Unrecognized shapes default to `UsEquity`, matching how upstream
    /// data providers treat free-form tickers.
    pub fn detect(symbol: &str) -> Self {
        let trimmed = symbol.trim();

        let digits = trimmed.chars().all(|c| c.is_ascii_digit());
        if digits && trimmed.len() == 6 {
            return Self::AShare;
        }
        if digits && (4..=5).contains(&trimmed.len()) {
            return Self::HkEquity;
        }
        if let Some(prefix) = trimmed
            .strip_suffix(".HK")
            .or_else(|| trimmed.strip_suffix(".hk"))
        {
            if (4..=5).contains(&prefix.len()) && prefix.chars().all(|c| c.is_ascii_digit()) {
                return Self::HkEquity;
            }
        }

        Self::UsEquity
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsEquity => "us_equity",
            Self::AShare => "a_share",
            Self::HkEquity => "hk_equity",
        }
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UsEquity => "US",
            Self::AShare => "A-share",
            Self::HkEquity => "HK",
        }
    }
}

impl std::fmt::Display for MarketCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of work submitted to the analysis engine.
///
/// The market category is assigned at construction and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub symbol: String,
    pub market: MarketCategory,
}

impl Job {
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let market = MarketCategory::detect(&symbol);
        Self { symbol, market }
    }
}

/// Analysis produced by the engine for one successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    /// Narrative analysis text from the engine
    pub summary: String,
    /// Annualized volatility estimate over the analysis window
    pub volatility: f64,
    /// Highest price observed in the analysis window
    pub period_high: f64,
    /// Lowest price observed in the analysis window
    pub period_low: f64,
}

impl AnalysisPayload {
    /// Width of the observed price range, the run report's ranking key.
    pub fn price_range(&self) -> f64 {
        self.period_high - self.period_low
    }
}

/// Terminal state of a job. Written exactly once, never overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// The engine returned an analysis
    Success(AnalysisPayload),
    /// Retries exhausted, or a quota failure ended the job immediately
    Failed { kind: FailureKind, message: String },
    /// Pre-empted without an engine attempt reaching a terminal state
    Skipped { reason: String },
}

impl JobOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Short status word used in logs and report status lines.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failed { .. } => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// A job together with its terminal outcome and attempt count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job: Job,
    pub outcome: JobOutcome,
    /// Number of engine calls actually made (0 for pre-empted jobs)
    pub attempts: u32,
}

/// Complete record of one batch run.
///
/// Reports appear in the same order as the input job list regardless of
/// retries or failures. Owned by the scheduler until the run finishes;
/// read-only afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub analysis_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub reports: Vec<JobReport>,
    /// Jobs that reached the engine at least once
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub breaker_tripped: bool,
    pub breaker_reason: Option<String>,
}

impl RunResult {
    /// Assemble a run result, deriving the aggregate counters from the
    /// per-job reports so they cannot drift apart.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: Uuid,
        analysis_date: NaiveDate,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        reports: Vec<JobReport>,
        breaker_tripped: bool,
        breaker_reason: Option<String>,
    ) -> Self {
        let succeeded = reports.iter().filter(|r| r.outcome.is_success()).count();
        let failed = reports.iter().filter(|r| r.outcome.is_failed()).count();
        let skipped = reports.iter().filter(|r| r.outcome.is_skipped()).count();

        Self {
            run_id,
            analysis_date,
            started_at,
            completed_at,
            reports,
            attempted: succeeded + failed,
            succeeded,
            failed,
            skipped,
            breaker_tripped,
            breaker_reason,
        }
    }

    pub fn total_jobs(&self) -> usize {
        self.reports.len()
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> Duration {
        (self.completed_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// One engine attempt for one job, as observed by the scheduler.
///
/// Published on the event channel for logging and tests; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub symbol: String,
    /// Attempt index; the first try is attempt 0
    pub attempt: u32,
    /// Backoff actually awaited before this attempt started
    pub waited_before: Duration,
    pub outcome: AttemptOutcome,
}

/// How a single engine attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(FailureKind),
}

/// Run lifecycle events published by the scheduler.
#[derive(Debug, Clone)]
pub enum OrchestrationEvent {
    /// A run began with this many jobs
    RunStarted { run_id: Uuid, total_jobs: usize },
    /// One engine attempt finished (success or classified failure)
    AttemptFinished(AttemptRecord),
    /// A job reached its terminal outcome
    JobFinalized {
        symbol: String,
        outcome: JobOutcome,
        attempts: u32,
    },
    /// The quota circuit breaker tripped
    BreakerTripped { reason: String },
    /// The run finished and the result is final
    RunCompleted {
        run_id: Uuid,
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
}
