//! Wire representation of a reported metric.
//!
//! ```json
//! {
//!   "apiVersion": "v3",
//!   "name": "requests.total",
//!   "fields": [{ "name": "counter", "value": 5 }],
//!   "tags": [{ "name": "service", "value": "core" }],
//!   "timestamp": 1700000000000000000
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API version stamped on every metric.
pub const API_VERSION: &str = "v3";

/// Why a metric could not be constructed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetricValidationError {
    #[error("metric name is empty")]
    EmptyName,

    #[error("metric has no fields")]
    NoFields,

    #[error("field name is empty")]
    EmptyFieldName,

    #[error("field '{field}' is not a finite number")]
    NonFiniteField { field: String },

    #[error("tag name is empty")]
    EmptyTagName,
}

/// Numeric field value. Integers stay integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
}

impl FieldValue {
    fn is_finite(self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Float(value) => value.is_finite(),
        }
    }

    /// Value as `f64`.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// One named reading of a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricField {
    pub name: String,
    pub value: FieldValue,
}

impl MetricField {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Dimension label attached to a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTag {
    pub name: String,
    pub value: String,
}

impl MetricTag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A metric ready to be serialized and published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub api_version: String,
    pub name: String,
    pub fields: Vec<MetricField>,
    pub tags: Vec<MetricTag>,
    /// Unix time in nanoseconds when the metric was built.
    pub timestamp: i64,
}

impl Metric {
    /// Build and validate a metric stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<MetricField>,
        tags: Vec<MetricTag>,
    ) -> Result<Self, MetricValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(MetricValidationError::EmptyName);
        }
        if fields.is_empty() {
            return Err(MetricValidationError::NoFields);
        }
        for field in &fields {
            if field.name.is_empty() {
                return Err(MetricValidationError::EmptyFieldName);
            }
            if !field.value.is_finite() {
                return Err(MetricValidationError::NonFiniteField {
                    field: field.name.clone(),
                });
            }
        }
        if tags.iter().any(|tag| tag.name.is_empty()) {
            return Err(MetricValidationError::EmptyTagName);
        }

        Ok(Self {
            api_version: API_VERSION.to_string(),
            name,
            fields,
            tags,
            timestamp: chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        })
    }

    /// First field called `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value)
    }

    /// Every value tagged `name`, in order.
    #[must_use]
    pub fn tag_values(&self, name: &str) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
            .collect()
    }
}

/// Convert a tag map to a tag list, ordered by tag name.
#[must_use]
pub fn build_metric_tags(tags: &BTreeMap<String, String>) -> Vec<MetricTag> {
    tags.iter()
        .map(|(name, value)| MetricTag::new(name.clone(), value.clone()))
        .collect()
}
