//! # Error Handling
//!
//! Crate-level error type and `Result` alias shared across the library.
//!
//! Orchestration deliberately does not surface errors through this type:
//! a batch run always completes and reports per-job failures as data in
//! the `RunResult`. `AnalystError` covers the setup and post-processing
//! edges around a run (configuration, artifact I/O, job-list resolution),
//! where failing fast is the right behavior.

use crate::config::ConfigurationError;

/// Errors raised outside the run loop: setup, persistence, and wiring.
#[derive(Debug, thiserror::Error)]
pub enum AnalystError {
    /// Configuration loading or validation failed
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Filesystem operation failed (artifact output, log directory)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization of a run artifact failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction failed (engine or delivery transport)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A named job list was requested but is not defined in configuration
    #[error("Unknown job list '{0}'")]
    UnknownJobList(String),

    /// Job intake produced zero jobs
    #[error("Empty job list: {0}")]
    EmptyJobList(String),
}

impl AnalystError {
    pub fn unknown_job_list(name: impl Into<String>) -> Self {
        Self::UnknownJobList(name.into())
    }

    pub fn empty_job_list(detail: impl Into<String>) -> Self {
        Self::EmptyJobList(detail.into())
    }
}

/// Convenient Result type for library operations
pub type Result<T> = std::result::Result<T, AnalystError>;
