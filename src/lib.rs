#![allow(clippy::doc_markdown)] // Allow technical terms like YAML, JSON in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Analyst Core Rust
//!
//! Reliability-focused batch orchestration for market analysis jobs driven
//! through an unreliable external analysis engine.
//!
//! ## Overview
//!
//! The engine being driven rate-limits, exhausts quotas, and fails
//! transiently; this crate's job is to get as many analyses through it as
//! the conditions allow, and to account precisely for the rest. Jobs are
//! paced in sequential batches, failures are classified from message text
//! into retry policies, quota exhaustion latches a run-wide circuit
//! breaker, and finished runs are aggregated, rendered, persisted, and
//! delivered over failover transports.
//!
//! ## Architecture
//!
//! ```text
//! CLI (batch-analyst)
//!   └── BatchScheduler ──► AnalysisEngine (HTTP)
//!         │    ├── ErrorClassifier ─► FailureKind
//!         │    ├── RetryPolicy (exponential backoff)
//!         │    ├── QuotaCircuitBreaker (one-way latch)
//!         │    └── CancellationSignal (Ctrl-C)
//!         ▼
//!       RunResult ─► ResultAggregator ─► ReportRenderer
//!                                          ├── ArtifactStore (JSON + markdown)
//!                                          └── DeliveryFailoverSender ─► transports
//! ```
//!
//! ## Module Organization
//!
//! - [`orchestration`] - scheduler, classifier, retry policy, breaker, aggregator
//! - [`engine`] - analysis engine trait, HTTP client, scripted test engine
//! - [`delivery`] - transport configs, webhook transport, failover sender
//! - [`report`] - markdown rendering for jobs, summaries, notifications
//! - [`artifacts`] - per-date run output on disk
//! - [`config`] - YAML configuration with environment overrides
//! - [`events`] - broadcast channel for run lifecycle events
//! - [`error`] - crate-level error handling
//! - [`logging`] - structured console + JSON file logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use analyst_core::config::BatchConfig;
//! use analyst_core::engine::ScriptedEngine;
//! use analyst_core::orchestration::{BatchScheduler, ResultAggregator};
//! use analyst_core::orchestration::types::Job;
//!
//! # async fn example() {
//! let engine = Arc::new(ScriptedEngine::new());
//! let scheduler = BatchScheduler::new(engine, BatchConfig::for_testing());
//!
//! let jobs = vec![Job::new("AAPL"), Job::new("0700.HK")];
//! let date = chrono::Utc::now().date_naive();
//! let result = scheduler.run(jobs, date).await;
//!
//! let summary = ResultAggregator::new().aggregate(&result);
//! println!("{}/{} succeeded", summary.succeeded, summary.total_jobs);
//! # }
//! ```

pub mod artifacts;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod orchestration;
pub mod report;

pub use artifacts::{ArtifactStore, RunArtifacts};
pub use config::{AnalystConfig, BatchConfig, ConfigManager, EngineConfig};
pub use delivery::{
    DeliveryFailoverSender, DeliveryReport, NotificationMessage, TransportConfig, WebhookTransport,
};
pub use engine::{AnalysisEngine, EngineError, HttpAnalysisEngine, ScriptedEngine};
pub use error::{AnalystError, Result};
pub use events::EventPublisher;
pub use orchestration::{
    BatchScheduler, CancellationSignal, ErrorClassifier, FailureKind, QuotaCircuitBreaker,
    ResultAggregator, RetryPolicy,
};
pub use orchestration::types::{Job, JobOutcome, JobReport, MarketCategory, RunResult};
pub use report::ReportRenderer;
