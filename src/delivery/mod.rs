//! # Delivery Failover Subsystem
//!
//! Delivers one rendered notification through the best available
//! transport configuration.
//!
//! ## Overview
//!
//! Operators list several candidate configurations for the same
//! notification provider (different ports and security modes, tried
//! cheaply in order of expected success). The failover sender walks that
//! list: a transient transport failure moves on to the next candidate,
//! while an authentication failure aborts the whole list, because a bad
//! credential cannot be fixed by a different port.
//!
//! ```text
//! configs ──▶ attempt ──▶ Success            stop, delivered
//!               │
//!               ├───────▶ TransientFailure   record, next config
//!               │
//!               └───────▶ AuthFailure        stop, not delivered
//! ```
//!
//! Delivery is strictly post-processing: it runs on a finalized
//! `RunResult` and its outcome never changes job outcomes.

pub mod failover;
pub mod transport;

use serde::{Deserialize, Serialize};

pub use failover::{DeliveryFailoverSender, DeliveryReport, TransportAttempt};
pub use transport::{NotificationTransport, ScriptedTransport, WebhookTransport};

/// Channel security for one transport configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    /// Secure channel from the first byte (https)
    Tls,
    /// Unencrypted channel (http)
    Plaintext,
}

impl SecurityMode {
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Tls => "https",
            Self::Plaintext => "http",
        }
    }
}

fn default_path() -> String {
    "/notifications".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

/// One candidate transport configuration, tried in list order.
///
/// Secrets never live in configuration: `secret_env` names the
/// environment variable holding the credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Short name used in logs and diagnostics
    pub label: String,
    pub host: String,
    pub port: u16,
    pub security: SecurityMode,
    #[serde(default = "default_path")]
    pub path: String,
    /// Username for basic auth; token auth when absent
    #[serde(default)]
    pub username: Option<String>,
    /// Environment variable holding the credential
    pub secret_env: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl TransportConfig {
    /// Full endpoint URL for this configuration.
    pub fn endpoint(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.security.scheme(),
            self.host,
            self.port,
            self.path
        )
    }
}

/// Outcome of a single transport attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DeliveryAttemptResult {
    /// The notification was transmitted
    Success,
    /// Credential rejected or unresolvable; other configurations for
    /// the same provider cannot help
    AuthFailure(String),
    /// Network or protocol error; the next configuration may still work
    TransientFailure(String),
}

impl DeliveryAttemptResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// The rendered notification handed to delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}
