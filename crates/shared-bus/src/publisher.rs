//! # Message Publisher
//!
//! The publishing port and its in-memory implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::envelope::MessageEnvelope;
use crate::error::BusError;
use crate::subscriber::{MessageStream, Subscription};
use crate::topic::{validate_filter, validate_publish_topic};
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Transport abstraction used to publish envelopes.
///
/// A successful return means the transport accepted the message; there is
/// no delivery confirmation beyond that.
#[async_trait]
pub trait MessageClient: Send + Sync {
    /// Publish `envelope` to `topic`.
    async fn publish(&self, envelope: MessageEnvelope, topic: &str) -> Result<(), BusError>;
}

/// A published message as carried on the broadcast channel.
#[derive(Debug, Clone)]
pub(crate) struct BusMessage {
    pub(crate) topic: String,
    pub(crate) envelope: MessageEnvelope,
}

/// In-memory implementation of the message bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
/// semantics. Suitable for single-process use and tests; a broker-backed
/// client replaces it in deployments.
pub struct InMemoryMessageBus {
    sender: broadcast::Sender<BusMessage>,
    messages_published: AtomicU64,
    capacity: usize,
}

impl InMemoryMessageBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with the given per-subscriber buffer.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to every topic matching one of `filters`.
    pub fn subscribe<I, S>(&self, filters: I) -> Result<Subscription, BusError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filters: Vec<String> = filters.into_iter().map(Into::into).collect();
        for filter in &filters {
            validate_filter(filter)?;
        }

        debug!(filters = ?filters, "New subscription created");
        Ok(Subscription::new(self.sender.subscribe(), filters))
    }

    /// Subscribe and wrap the subscription as a stream.
    pub fn message_stream<I, S>(&self, filters: I) -> Result<MessageStream, BusError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.subscribe(filters)?.into_stream())
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Per-subscriber buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total messages accepted for publishing.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageClient for InMemoryMessageBus {
    async fn publish(&self, envelope: MessageEnvelope, topic: &str) -> Result<(), BusError> {
        validate_publish_topic(topic)?;
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let correlation_id = envelope.correlation_id;
        let message = BusMessage {
            topic: topic.to_string(),
            envelope,
        };

        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(topic, %correlation_id, receivers, "Message published");
            }
            Err(_) => {
                // Nobody listening; fire-and-forget semantics.
                warn!(topic, %correlation_id, "Message dropped (no subscribers)");
            }
        }
        Ok(())
    }
}
