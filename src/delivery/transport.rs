//! Notification transports.
//!
//! The failover sender speaks to a `NotificationTransport`; production
//! wiring uses `WebhookTransport` (HTTP POST with the security mode
//! choosing the scheme), tests use `ScriptedTransport`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::{DeliveryAttemptResult, NotificationMessage, TransportConfig};
use crate::error::{AnalystError, Result};

/// One delivery attempt against one transport configuration.
///
/// Implementations perform the whole connect, secure, authenticate,
/// transmit sequence for a single configuration and report the tagged
/// outcome; they never retry internally. Cross-configuration fallback
/// belongs to the failover sender.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn attempt(
        &self,
        config: &TransportConfig,
        message: &NotificationMessage,
    ) -> DeliveryAttemptResult;

    /// Transport name for logging.
    fn name(&self) -> &'static str {
        "notification-transport"
    }
}

/// HTTP webhook transport.
///
/// The security mode selects the scheme (`Tls` posts over https), the
/// credential comes from the environment variable named by the config,
/// and the message is transmitted as a JSON body. A 401/403 response is
/// an authentication failure; connection errors, timeouts, and other
/// statuses are transient.
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(AnalystError::Http)?;
        Ok(Self { client })
    }

    fn resolve_secret(config: &TransportConfig) -> Option<String> {
        match std::env::var(&config.secret_env) {
            Ok(secret) if !secret.is_empty() => Some(secret),
            _ => None,
        }
    }
}

#[async_trait]
impl NotificationTransport for WebhookTransport {
    async fn attempt(
        &self,
        config: &TransportConfig,
        message: &NotificationMessage,
    ) -> DeliveryAttemptResult {
        // A missing credential short-circuits before any network I/O:
        // it would fail every configuration the same way.
        let Some(secret) = Self::resolve_secret(config) else {
            return DeliveryAttemptResult::AuthFailure(format!(
                "credential environment variable {} is not set",
                config.secret_env
            ));
        };

        let endpoint = config.endpoint();
        debug!(label = %config.label, endpoint = %endpoint, "📮 TRANSPORT: posting notification");

        let mut request = self
            .client
            .post(&endpoint)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .json(message);
        request = match &config.username {
            Some(username) => request.basic_auth(username, Some(secret)),
            None => request.bearer_auth(secret),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                return DeliveryAttemptResult::TransientFailure(format!(
                    "connection error to {endpoint}: {e}"
                ));
            }
            Err(e) if e.is_timeout() => {
                return DeliveryAttemptResult::TransientFailure(format!(
                    "timed out after {}s posting to {endpoint}",
                    config.timeout_seconds
                ));
            }
            Err(e) => {
                return DeliveryAttemptResult::TransientFailure(format!("network error: {e}"));
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return DeliveryAttemptResult::AuthFailure(format!(
                "authentication rejected by {endpoint} ({status})"
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return DeliveryAttemptResult::TransientFailure(format!(
                "transport returned {status}: {body}"
            ));
        }

        DeliveryAttemptResult::Success
    }

    fn name(&self) -> &'static str {
        "webhook-transport"
    }
}

/// Scripted transport for tests: fixed result per configuration label,
/// with a record of which labels were attempted and in what order.
#[derive(Default)]
pub struct ScriptedTransport {
    results: Mutex<HashMap<String, DeliveryAttemptResult>>,
    attempted: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result for one configuration label. Unscripted labels
    /// succeed.
    pub fn with_result(self, label: impl Into<String>, result: DeliveryAttemptResult) -> Self {
        self.results.lock().insert(label.into(), result);
        self
    }

    /// Labels attempted so far, in order.
    pub fn attempted_labels(&self) -> Vec<String> {
        self.attempted.lock().clone()
    }
}

#[async_trait]
impl NotificationTransport for ScriptedTransport {
    async fn attempt(
        &self,
        config: &TransportConfig,
        _message: &NotificationMessage,
    ) -> DeliveryAttemptResult {
        self.attempted.lock().push(config.label.clone());
        self.results
            .lock()
            .get(&config.label)
            .cloned()
            .unwrap_or(DeliveryAttemptResult::Success)
    }

    fn name(&self) -> &'static str {
        "scripted-transport"
    }
}
