//! Errors from message bus operations.

use thiserror::Error;

/// Errors returned by a [`MessageClient`](crate::MessageClient) or subscription.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Topic or filter is malformed.
    #[error("Invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: String },

    /// The bus was shut down.
    #[error("Message bus closed")]
    Closed,

    /// The underlying transport failed to deliver.
    #[error("Transport error: {0}")]
    Transport(String),
}
