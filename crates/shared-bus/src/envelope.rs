//! # Message Envelope
//!
//! Transport-level wrapper around a serialized payload.

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use uuid::Uuid;

/// Content type of JSON payloads.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type of CBOR payloads.
pub const CONTENT_TYPE_CBOR: &str = "application/cbor";

/// Envelope published on the bus.
///
/// - `correlation_id` is freshly generated for every message
/// - `payload` is opaque to the bus; `content_type` says how to decode it
/// - `received_topic` is filled in on delivery, empty when publishing
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    #[serde(rename = "correlationID")]
    pub correlation_id: Uuid,

    #[serde_as(as = "Base64")]
    pub payload: Vec<u8>,

    pub content_type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub received_topic: String,
}

impl MessageEnvelope {
    /// Wrap `payload` with a new correlation id.
    pub fn new(payload: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            payload,
            content_type: content_type.into(),
            received_topic: String::new(),
        }
    }

    /// Wrap a JSON payload with a new correlation id.
    pub fn json(payload: Vec<u8>) -> Self {
        Self::new(payload, CONTENT_TYPE_JSON)
    }

    /// Replace the correlation id, e.g. to answer a request.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Decode a JSON payload.
    pub fn decode_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}
