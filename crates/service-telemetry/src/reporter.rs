//! Publishes registry snapshots as tagged metrics on the message bus.
//!
//! One report cycle:
//!
//! ```text
//! registry.each ──→ enabled? ──→ fields ──→ Metric ──→ JSON ──→ envelope ──→ publish
//!                      │ no        │ unsupported      │ invalid   │ error       │ error
//!                      ▼           ▼                  ▼           ▼             ▼
//!                   skipped     MetricFailure (collected, cycle continues)
//! ```
//!
//! Metrics are published to `<prefix>/<service>/<metric name>`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use shared_bus::{build_topic, BusError, MessageClient, MessageEnvelope};
use thiserror::Error;
use tracing::debug;

use crate::config::SharedTelemetryConfig;
use crate::dto::{build_metric_tags, Metric, MetricField, MetricTag, MetricValidationError};
use crate::registry::{MetricSnapshot, MetricTags, MetricsRegistry};

/// Tag carrying the reporting service's name.
pub const SERVICE_TAG: &str = "service";

/// A single metric that could not be published.
#[derive(Debug, Error)]
pub enum MetricFailure {
    #[error("metric type {kind} not supported (metric '{name}')")]
    UnsupportedKind { name: String, kind: &'static str },

    #[error("unable to create metric for '{name}': {source}")]
    InvalidMetric {
        name: String,
        #[source]
        source: MetricValidationError,
    },

    #[error("failed to marshal metric '{name}' to JSON: {source}")]
    Serialization {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to publish metric '{name}' to topic '{topic}': {source}")]
    Publish {
        name: String,
        topic: String,
        #[source]
        source: BusError,
    },
}

impl MetricFailure {
    /// Name of the metric that failed.
    #[must_use]
    pub fn metric_name(&self) -> &str {
        match self {
            Self::UnsupportedKind { name, .. }
            | Self::InvalidMetric { name, .. }
            | Self::Serialization { name, .. }
            | Self::Publish { name, .. } => name,
        }
    }
}

/// Every failure of one report cycle.
#[derive(Debug, Error)]
#[error("{}", render_failures(.failures))]
pub struct ReportError {
    pub failures: Vec<MetricFailure>,
}

fn render_failures(failures: &[MetricFailure]) -> String {
    let causes: Vec<String> = failures.iter().map(ToString::to_string).collect();
    format!(
        "{} metric(s) failed to report: {}",
        failures.len(),
        causes.join("; ")
    )
}

/// Outcome of one report cycle.
#[derive(Debug, Default)]
#[must_use]
pub struct ReportSummary {
    /// Metrics published successfully.
    pub published: usize,
    /// Metrics that were enabled but could not be published.
    pub failures: Vec<MetricFailure>,
}

impl ReportSummary {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another cycle's outcome into this one.
    pub fn merge(&mut self, other: ReportSummary) {
        self.published += other.published;
        self.failures.extend(other.failures);
    }

    /// `Ok(published)` or the aggregate error.
    pub fn into_result(self) -> Result<usize, ReportError> {
        if self.failures.is_empty() {
            Ok(self.published)
        } else {
            Err(ReportError {
                failures: self.failures,
            })
        }
    }
}

/// Drains a registry once and ships its metrics somewhere.
#[async_trait]
pub trait MetricsReporter: Send + Sync {
    /// Report every enabled metric in `registry`.
    ///
    /// `metric_tags` holds per-metric tags added after the service tags.
    /// Individual failures never stop the cycle.
    async fn report(&self, registry: &dyn MetricsRegistry, metric_tags: &MetricTags)
        -> ReportSummary;
}

/// Reporter publishing to a [`MessageClient`].
pub struct MessageBusReporter {
    service_name: String,
    message_client: Arc<dyn MessageClient>,
    config: SharedTelemetryConfig,
}

impl MessageBusReporter {
    pub fn new(
        service_name: impl Into<String>,
        message_client: Arc<dyn MessageClient>,
        config: SharedTelemetryConfig,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            message_client,
            config,
        }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// `<prefix>/<service>` under the current configuration.
    #[must_use]
    pub fn base_topic(&self) -> String {
        let prefix = self.config.snapshot().publish_topic_prefix;
        build_topic(&[&prefix, &self.service_name])
    }

    fn service_tags(&self, static_tags: &BTreeMap<String, String>) -> Vec<MetricTag> {
        let mut tags = build_metric_tags(static_tags);
        tags.push(MetricTag::new(SERVICE_TAG, self.service_name.clone()));
        tags
    }

    async fn publish_one(
        &self,
        base_topic: &str,
        name: &str,
        fields: Vec<MetricField>,
        tags: Vec<MetricTag>,
    ) -> Result<(), MetricFailure> {
        let metric = Metric::new(name, fields, tags).map_err(|source| {
            MetricFailure::InvalidMetric {
                name: name.to_string(),
                source,
            }
        })?;
        let payload = serde_json::to_vec(&metric).map_err(|source| MetricFailure::Serialization {
            name: name.to_string(),
            source,
        })?;

        let topic = build_topic(&[base_topic, name]);
        self.message_client
            .publish(MessageEnvelope::json(payload), &topic)
            .await
            .map_err(|source| MetricFailure::Publish {
                name: name.to_string(),
                topic,
                source,
            })
    }
}

impl std::fmt::Debug for MessageBusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBusReporter")
            .field("service_name", &self.service_name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MetricsReporter for MessageBusReporter {
    async fn report(
        &self,
        registry: &dyn MetricsRegistry,
        metric_tags: &MetricTags,
    ) -> ReportSummary {
        // One configuration read per cycle, so a concurrent reload never
        // splits a cycle between two configurations.
        let config = self.config.snapshot();
        let base_topic = build_topic(&[&config.publish_topic_prefix, &self.service_name]);
        let service_tags = self.service_tags(&config.tags);
        let series_tags = registry.series_tags();

        let mut pending: Vec<(String, MetricSnapshot)> = Vec::new();
        registry.each(&mut |name, snapshot| {
            if config.metric_enabled(name) {
                pending.push((name.to_string(), snapshot));
            }
        });

        let mut summary = ReportSummary::default();
        for (name, snapshot) in pending {
            let Some(fields) = snapshot.fields() else {
                summary.failures.push(MetricFailure::UnsupportedKind {
                    kind: snapshot.kind(),
                    name,
                });
                continue;
            };

            let mut tags = service_tags.clone();
            for dynamic in [metric_tags.get(&name), series_tags.get(&name)]
                .into_iter()
                .flatten()
            {
                tags.extend(build_metric_tags(dynamic));
            }

            match self.publish_one(&base_topic, &name, fields, tags).await {
                Ok(()) => summary.published += 1,
                Err(failure) => summary.failures.push(failure),
            }
        }

        debug!(
            published = summary.published,
            failed = summary.failures.len(),
            topic = %base_topic,
            "Published metrics"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelemetryInfo;
    use crate::dto::FieldValue;
    use crate::registry::Registry;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        published: Mutex<Vec<(String, MessageEnvelope)>>,
    }

    #[async_trait]
    impl MessageClient for RecordingClient {
        async fn publish(&self, envelope: MessageEnvelope, topic: &str) -> Result<(), BusError> {
            self.published.lock().push((topic.to_string(), envelope));
            Ok(())
        }
    }

    fn config(metrics: &[(&str, bool)], tags: &[(&str, &str)]) -> SharedTelemetryConfig {
        SharedTelemetryConfig::new(TelemetryInfo {
            metrics: metrics.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..TelemetryInfo::default()
        })
    }

    #[test]
    fn test_base_topic() {
        let reporter = MessageBusReporter::new(
            "core",
            Arc::new(RecordingClient::default()),
            SharedTelemetryConfig::default(),
        );
        assert_eq!(reporter.base_topic(), "edgex/telemetry/core");
        assert_eq!(reporter.service_name(), "core");
    }

    #[tokio::test]
    async fn test_tag_order_service_then_metric() {
        let client = Arc::new(RecordingClient::default());
        let reporter = MessageBusReporter::new(
            "core",
            client.clone(),
            config(&[("hits", true)], &[("zone", "b"), ("env", "prod")]),
        );
        let registry = Registry::new();
        registry.counter("hits").unwrap().inc(1);

        let mut metric_tags = MetricTags::new();
        metric_tags.insert(
            "hits".to_string(),
            [("route".to_string(), "/a".to_string())].into_iter().collect(),
        );

        let summary = reporter.report(&registry, &metric_tags).await;
        assert_eq!(summary.published, 1);

        let published = client.published.lock();
        let metric: Metric = published[0].1.decode_json().unwrap();
        let names: Vec<&str> = metric.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["env", "zone", "service", "route"]);
    }

    #[tokio::test]
    async fn test_duplicate_tag_names_are_kept() {
        let client = Arc::new(RecordingClient::default());
        let reporter = MessageBusReporter::new(
            "core",
            client.clone(),
            config(&[("hits", true)], &[("env", "prod")]),
        );
        let registry = Registry::new();
        registry.counter("hits").unwrap();

        let mut metric_tags = MetricTags::new();
        metric_tags.insert(
            "hits".to_string(),
            [("env".to_string(), "canary".to_string())].into_iter().collect(),
        );

        let summary = reporter.report(&registry, &metric_tags).await;
        assert!(summary.is_success());

        let published = client.published.lock();
        let metric: Metric = published[0].1.decode_json().unwrap();
        assert_eq!(metric.tag_values("env"), ["prod", "canary"]);
    }

    #[tokio::test]
    async fn test_envelope_is_json_with_fresh_ids() {
        let client = Arc::new(RecordingClient::default());
        let reporter = MessageBusReporter::new("core", client.clone(), config(&[("", true)], &[]));
        let registry = Registry::new();
        registry.counter("a").unwrap();
        registry.counter("b").unwrap();

        let _ = reporter.report(&registry, &MetricTags::new()).await;

        let published = client.published.lock();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].1.content_type, shared_bus::CONTENT_TYPE_JSON);
        assert_ne!(published[0].1.correlation_id, published[1].1.correlation_id);
        let metric: Metric = published[1].1.decode_json().unwrap();
        assert_eq!(metric.field("counter"), Some(FieldValue::Int(0)));
    }

    #[test]
    fn test_summary_into_result() {
        assert_eq!(ReportSummary::default().into_result().unwrap(), 0);

        let mut summary = ReportSummary {
            published: 1,
            failures: vec![MetricFailure::UnsupportedKind {
                name: "h".into(),
                kind: "histogram",
            }],
        };
        summary.merge(ReportSummary {
            published: 2,
            failures: Vec::new(),
        });
        assert_eq!(summary.published, 3);
        assert!(!summary.is_success());

        let err = summary.into_result().unwrap_err();
        assert_eq!(err.failures[0].metric_name(), "h");
        assert_eq!(
            err.to_string(),
            "1 metric(s) failed to report: metric type histogram not supported (metric 'h')"
        );
    }
}
