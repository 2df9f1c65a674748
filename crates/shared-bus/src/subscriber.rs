//! # Message Subscriber
//!
//! Receiving side of the in-memory bus.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

use crate::envelope::MessageEnvelope;
use crate::error::BusError;
use crate::publisher::BusMessage;
use crate::topic::topic_matches;

fn accepts(filters: &[String], topic: &str) -> bool {
    filters.iter().any(|filter| topic_matches(filter, topic))
}

fn deliver(message: BusMessage) -> MessageEnvelope {
    let mut envelope = message.envelope;
    envelope.received_topic = message.topic;
    envelope
}

/// A subscription handle for receiving envelopes.
///
/// Delivered envelopes carry the topic they were published to in
/// `received_topic`. Dropping the handle unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<BusMessage>,
    filters: Vec<String>,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<BusMessage>, filters: Vec<String>) -> Self {
        Self { receiver, filters }
    }

    /// Receive the next matching envelope.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<MessageEnvelope> {
        loop {
            let message = match self.receiver.recv().await {
                Ok(message) => message,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some messages dropped");
                    continue;
                }
            };

            if accepts(&self.filters, &message.topic) {
                return Some(deliver(message));
            }
        }
    }

    /// Receive the next matching envelope without waiting.
    ///
    /// `Ok(None)` means nothing matching is buffered right now.
    pub fn try_recv(&mut self) -> Result<Option<MessageEnvelope>, BusError> {
        loop {
            let message = match self.receiver.try_recv() {
                Ok(message) => message,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(BusError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if accepts(&self.filters, &message.topic) {
                return Ok(Some(deliver(message)));
            }
        }
    }

    /// Filters of this subscription.
    #[must_use]
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Convert into a `Stream` of matching envelopes.
    #[must_use]
    pub fn into_stream(self) -> MessageStream {
        MessageStream {
            inner: BroadcastStream::new(self.receiver),
            filters: self.filters,
        }
    }
}

/// Stream of envelopes matching a subscription's filters.
pub struct MessageStream {
    inner: BroadcastStream<BusMessage>,
    filters: Vec<String>,
}

impl MessageStream {
    /// Filters of the underlying subscription.
    #[must_use]
    pub fn filters(&self) -> &[String] {
        &self.filters
    }
}

impl Stream for MessageStream {
    type Item = MessageEnvelope;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(message))) => {
                    if accepts(&this.filters, &message.topic) {
                        return Poll::Ready(Some(deliver(message)));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    debug!(lagged = count, "Stream lagged, some messages dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{InMemoryMessageBus, MessageClient};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_subscription_recv_sets_received_topic() {
        let bus = InMemoryMessageBus::new();
        let mut sub = bus.subscribe(["metrics/#"]).unwrap();

        let sent = MessageEnvelope::json(b"1".to_vec());
        bus.publish(sent.clone(), "metrics/core/up").await.unwrap();

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("envelope");

        assert_eq!(received.correlation_id, sent.correlation_id);
        assert_eq!(received.received_topic, "metrics/core/up");
    }

    #[tokio::test]
    async fn test_subscription_filter() {
        let bus = InMemoryMessageBus::new();
        let mut sub = bus.subscribe(["metrics/+/up"]).unwrap();

        bus.publish(MessageEnvelope::json(b"skip".to_vec()), "events/core/up")
            .await
            .unwrap();
        bus.publish(MessageEnvelope::json(b"take".to_vec()), "metrics/core/up")
            .await
            .unwrap();

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("envelope");
        assert_eq!(received.payload, b"take");
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let bus = InMemoryMessageBus::new();
        {
            let _a = bus.subscribe(["#"]).unwrap();
            let _b = bus.subscribe(["#"]).unwrap();
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = InMemoryMessageBus::new();
        let mut sub = bus.subscribe(["a"]).unwrap();
        assert!(matches!(sub.try_recv(), Ok(None)));

        bus.publish(MessageEnvelope::json(Vec::new()), "b").await.unwrap();
        assert!(matches!(sub.try_recv(), Ok(None)));

        bus.publish(MessageEnvelope::json(Vec::new()), "a").await.unwrap();
        assert!(matches!(sub.try_recv(), Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_try_recv_closed() {
        let bus = InMemoryMessageBus::new();
        let mut sub = bus.subscribe(["a"]).unwrap();
        drop(bus);
        assert_eq!(sub.try_recv(), Err(BusError::Closed));
    }

    #[tokio::test]
    async fn test_message_stream() {
        let bus = InMemoryMessageBus::new();
        let mut stream = bus.message_stream(["t/#"]).unwrap();
        assert_eq!(stream.filters(), ["t/#".to_string()]);

        bus.publish(MessageEnvelope::json(b"x".to_vec()), "other").await.unwrap();
        bus.publish(MessageEnvelope::json(b"y".to_vec()), "t/1").await.unwrap();
        drop(bus);

        let first = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("envelope");
        assert_eq!(first.payload, b"y");
        assert_eq!(first.received_topic, "t/1");

        let end = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout");
        assert!(end.is_none());
    }
}
