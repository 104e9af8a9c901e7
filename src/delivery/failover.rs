//! Delivery failover across an ordered transport list.
//!
//! Configurations are tried strictly in list order. A transient failure
//! moves to the next configuration; an authentication failure aborts the
//! whole list, because a rejected credential will not start working on a
//! different host. Every attempt is recorded in the report regardless of
//! the final outcome.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use super::transport::NotificationTransport;
use super::{DeliveryAttemptResult, NotificationMessage, TransportConfig};

/// One attempt against one transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportAttempt {
    pub label: String,
    pub result: DeliveryAttemptResult,
}

/// Outcome of a full failover pass over the configuration list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Whether any configuration accepted the message.
    pub delivered: bool,
    /// Label of the configuration that succeeded, if any.
    pub delivered_via: Option<String>,
    /// Every attempt made, in list order.
    pub attempts: Vec<TransportAttempt>,
}

impl DeliveryReport {
    fn not_delivered(attempts: Vec<TransportAttempt>) -> Self {
        Self {
            delivered: false,
            delivered_via: None,
            attempts,
        }
    }

    fn delivered_via(label: String, attempts: Vec<TransportAttempt>) -> Self {
        Self {
            delivered: true,
            delivered_via: Some(label),
            attempts,
        }
    }
}

/// Walks the ordered transport configurations until one delivers.
pub struct DeliveryFailoverSender {
    transport: Arc<dyn NotificationTransport>,
}

impl DeliveryFailoverSender {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self { transport }
    }

    /// Attempt delivery through each configuration in order.
    ///
    /// Stops at the first success or the first authentication failure;
    /// transient failures fall through to the next configuration.
    #[instrument(skip(self, message, configs), fields(transport = self.transport.name(), configs = configs.len()))]
    pub async fn send(
        &self,
        message: &NotificationMessage,
        configs: &[TransportConfig],
    ) -> DeliveryReport {
        if configs.is_empty() {
            warn!("⚠️ DELIVERY: no transport configurations, nothing attempted");
            return DeliveryReport::not_delivered(Vec::new());
        }

        let mut attempts = Vec::with_capacity(configs.len());
        for config in configs {
            info!(
                label = %config.label,
                endpoint = %config.endpoint(),
                "📧 DELIVERY: attempting transport"
            );
            let result = self.transport.attempt(config, message).await;
            let attempt = TransportAttempt {
                label: config.label.clone(),
                result: result.clone(),
            };
            attempts.push(attempt);

            match result {
                DeliveryAttemptResult::Success => {
                    info!(label = %config.label, "✅ DELIVERY: notification delivered");
                    return DeliveryReport::delivered_via(config.label.clone(), attempts);
                }
                DeliveryAttemptResult::AuthFailure(reason) => {
                    error!(
                        label = %config.label,
                        reason = %reason,
                        "🚫 DELIVERY: authentication failure, aborting remaining transports"
                    );
                    return DeliveryReport::not_delivered(attempts);
                }
                DeliveryAttemptResult::TransientFailure(reason) => {
                    warn!(
                        label = %config.label,
                        reason = %reason,
                        "⚠️ DELIVERY: transport failed, trying next configuration"
                    );
                }
            }
        }

        error!(
            attempted = attempts.len(),
            "❌ DELIVERY: all transport configurations exhausted"
        );
        DeliveryReport::not_delivered(attempts)
    }
}
