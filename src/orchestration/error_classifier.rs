//! # Failure Classification
//!
//! Maps raw failure messages from the analysis engine to a `FailureKind`
//! that drives retry, backoff, and circuit-breaker policy.
//!
//! ## Overview
//!
//! The engine's failure vocabulary is not under our control: providers
//! report throttling and quota exhaustion as free-form text, with wording
//! that differs between providers and SDK versions. Classification is
//! therefore case-insensitive substring matching against three fixed,
//! auditable keyword tables. Quota exhaustion takes precedence over rate
//! limiting when a message matches both families, because quota is the
//! more severe condition (it ends the run, not just the attempt).
//!
//! ## Usage
//!
//! ```rust
//! use analyst_core::orchestration::error_classifier::{ErrorClassifier, FailureKind};
//!
//! let classifier = ErrorClassifier::new();
//! assert_eq!(
//!     classifier.classify("Error 429: Too Many Requests"),
//!     FailureKind::RateLimited
//! );
//! assert_eq!(
//!     classifier.classify("You exceeded your current quota"),
//!     FailureKind::QuotaExceeded
//! );
//! ```

use serde::{Deserialize, Serialize};

/// Phrases indicating the provider's quota is exhausted for the run.
///
/// `limit: 200` and `free_tier_requests` appear verbatim in the free-tier
/// rejection message of the primary analysis provider.
pub const QUOTA_EXHAUSTION_KEYWORDS: &[&str] = &[
    "quota exceeded",
    "quota_exceeded",
    "exceeded your current quota",
    "limit: 200",
    "free_tier_requests",
    "insufficient_quota",
];

/// Phrases indicating per-request throttling that a longer backoff clears.
pub const RATE_LIMIT_KEYWORDS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "too many requests",
    "429",
    "throttled",
    "api limit",
    "api_limit",
    "request limit",
];

/// Phrases indicating an infrastructure hiccup worth a standard retry.
pub const TRANSIENT_KEYWORDS: &[&str] = &[
    "timeout",
    "timed out",
    "connection",
    "network",
    "unavailable",
    "temporar",
    "reset",
    "refused",
    "unreachable",
    "500",
    "502",
    "503",
    "504",
    "interrupted",
    "broken pipe",
];

/// Classification assigned to a failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Infrastructure hiccup; retry with standard exponential backoff
    Transient,
    /// External throttling; retry with extended backoff
    RateLimited,
    /// Quota exhausted; fatal to the run, trips the circuit breaker
    QuotaExceeded,
    /// No keyword matched; retried like `Transient` but reported distinctly
    Unknown,
}

impl FailureKind {
    /// Whether this kind is eligible for retry at all.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::QuotaExceeded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::RateLimited => "rate_limited",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stateless keyword classifier for engine failure messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a raw failure message.
    ///
    /// Pure and deterministic: the same message always yields the same
    /// kind, independent of call order or prior classifications.
    pub fn classify(&self, message: &str) -> FailureKind {
        let lowered = message.to_lowercase();

        // Quota precedence: provider quota messages often also mention
        // rate limiting, and the quota reading must win.
        if Self::matches_any(&lowered, QUOTA_EXHAUSTION_KEYWORDS) {
            return FailureKind::QuotaExceeded;
        }
        if Self::matches_any(&lowered, RATE_LIMIT_KEYWORDS) {
            return FailureKind::RateLimited;
        }
        if Self::matches_any(&lowered, TRANSIENT_KEYWORDS) {
            return FailureKind::Transient;
        }

        FailureKind::Unknown
    }

    fn matches_any(lowered_message: &str, keywords: &[&str]) -> bool {
        keywords.iter().any(|kw| lowered_message.contains(kw))
    }
}
