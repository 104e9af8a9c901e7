//! # Event Publisher
//!
//! Broadcast channel for run lifecycle events. The scheduler publishes
//! attempt records and state changes here; log consumers and tests
//! subscribe. Nothing in the run loop depends on anyone listening.

use tokio::sync::broadcast;

use crate::orchestration::types::OrchestrationEvent;

/// Default broadcast capacity; a full channel drops the oldest events
/// for lagging subscribers rather than blocking the scheduler.
const DEFAULT_CAPACITY: usize = 1000;

/// Publisher for run lifecycle events.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<OrchestrationEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event.
    ///
    /// A channel with no subscribers is not an error; events are
    /// observability, not control flow.
    pub fn publish(&self, event: OrchestrationEvent) -> Result<(), PublishError> {
        // For broadcast channels, send() returns an error if there are no
        // subscribers. We publish events whether or not anyone is listening.
        match self.sender.send(event) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event channel is closed")]
    ChannelClosed,
}
