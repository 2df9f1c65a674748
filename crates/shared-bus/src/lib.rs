//! # Shared Bus - Message Client Port and In-Memory Bus
//!
//! Publish/subscribe plumbing used to ship service messages off-process.
//!
//! ## Pieces
//!
//! - `MessageClient`: the port (`publish(envelope, topic)`); broker-backed
//!   clients live outside this workspace
//! - `MessageEnvelope`: correlation id + payload bytes + content type
//! - `InMemoryMessageBus`: broadcast-channel implementation for
//!   single-process deployments and tests
//!
//! ```text
//! ┌──────────────┐  publish(env, "a/b/c")  ┌──────────────┐
//! │  Publisher   │ ──────────────────────→ │  Message Bus │
//! └──────────────┘                         └──────┬───────┘
//!                                                 │ filter "a/+/c", "a/#"
//!                                                 ▼
//!                                          ┌──────────────┐
//!                                          │ Subscription │
//!                                          └──────────────┘
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod container;
pub mod envelope;
pub mod error;
pub mod publisher;
pub mod subscriber;
pub mod topic;

pub use container::{
    message_client_from, message_client_key, named_message_client_from, named_message_client_key,
};
pub use envelope::{MessageEnvelope, CONTENT_TYPE_CBOR, CONTENT_TYPE_JSON};
pub use error::BusError;
pub use publisher::{InMemoryMessageBus, MessageClient};
pub use subscriber::{MessageStream, Subscription};
pub use topic::{build_topic, topic_matches};

/// Maximum messages to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
