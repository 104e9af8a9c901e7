//! # Analysis Engine Boundary
//!
//! The orchestrator drives jobs through an external analysis engine it
//! does not control. This module defines that seam: the `AnalysisEngine`
//! trait, the loosely-typed `EngineError` carrying the engine's raw
//! failure text, and two implementations.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐      ┌─────────────────────┐
//! │ BatchScheduler │─────▶│ dyn AnalysisEngine  │
//! └────────────────┘      ├─────────────────────┤
//!                         │ HttpAnalysisEngine  │  remote service (reqwest)
//!                         │ ScriptedEngine      │  tests and demos
//!                         └─────────────────────┘
//! ```
//!
//! Failures cross this boundary as text on purpose: the engine's failure
//! vocabulary (provider quota phrasing, HTTP statuses, SDK messages) is
//! not ours to type, and the classifier works on the raw wording.

pub mod http;
pub mod scripted;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::orchestration::types::{AnalysisPayload, Job};

pub use http::HttpAnalysisEngine;
pub use scripted::{ScriptedEngine, ScriptedResponse};

/// Raw failure text from an analysis attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for EngineError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for EngineError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// External analysis engine seam.
///
/// One call per attempt; the scheduler owns retries, pacing, and the
/// circuit breaker. Implementations should return rather than retry
/// internally, so the retry policy stays the single source of truth.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Analyze one job for the given date.
    async fn analyze(
        &self,
        job: &Job,
        analysis_date: NaiveDate,
    ) -> Result<AnalysisPayload, EngineError>;

    /// Engine name for logging.
    fn name(&self) -> &'static str {
        "analysis-engine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_preserves_raw_text() {
        let err = EngineError::new("Error 429: Too Many Requests");
        assert_eq!(err.message(), "Error 429: Too Many Requests");
        assert_eq!(err.to_string(), "Error 429: Too Many Requests");

        let from_string: EngineError = String::from("quota exceeded").into();
        assert_eq!(from_string.message(), "quota exceeded");
    }
}
