//! Adapter exposing a `prometheus::Registry` as a metrics source.
//!
//! Counters with whole values map to counter snapshots. Fractional counters,
//! gauges and untyped series map to float gauges, histograms and summaries to histogram snapshots (which the
//! reporter does not publish). A labelled series is named after its family
//! with the label values appended, e.g. `http_requests.GET.200`, and its
//! labels are exposed as series tags.

use std::collections::BTreeMap;

use prometheus::proto::{LabelPair, MetricFamily, MetricType};

use super::{HistogramSnapshot, MetricSnapshot, MetricTags, MetricsRegistry};

/// Metrics source backed by a Prometheus registry.
#[derive(Clone, Default)]
pub struct PrometheusRegistry {
    inner: prometheus::Registry,
}

impl PrometheusRegistry {
    pub fn new(inner: prometheus::Registry) -> Self {
        Self { inner }
    }

    /// The wrapped registry, for registering collectors.
    #[must_use]
    pub fn inner(&self) -> &prometheus::Registry {
        &self.inner
    }

    fn series_name(family: &str, labels: &[LabelPair]) -> String {
        labels.iter().fold(family.to_string(), |mut name, label| {
            name.push('.');
            name.push_str(label.get_value());
            name
        })
    }

    /// Prometheus counters are `f64`; only whole values fit an integer counter.
    fn counter_snapshot(value: f64) -> MetricSnapshot {
        if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
            MetricSnapshot::Counter(value as i64)
        } else {
            MetricSnapshot::GaugeFloat64(value)
        }
    }

    fn snapshot(family: &MetricFamily, metric: &prometheus::proto::Metric) -> MetricSnapshot {
        match family.get_field_type() {
            MetricType::COUNTER => Self::counter_snapshot(metric.get_counter().get_value()),
            MetricType::GAUGE => MetricSnapshot::GaugeFloat64(metric.get_gauge().get_value()),
            MetricType::UNTYPED => MetricSnapshot::GaugeFloat64(metric.get_untyped().get_value()),
            MetricType::HISTOGRAM => {
                let histogram = metric.get_histogram();
                MetricSnapshot::Histogram(HistogramSnapshot {
                    count: histogram.get_sample_count() as i64,
                    sum: histogram.get_sample_sum(),
                })
            }
            MetricType::SUMMARY => {
                let summary = metric.get_summary();
                MetricSnapshot::Histogram(HistogramSnapshot {
                    count: summary.get_sample_count() as i64,
                    sum: summary.get_sample_sum(),
                })
            }
        }
    }
}

impl std::fmt::Debug for PrometheusRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusRegistry").finish_non_exhaustive()
    }
}

impl MetricsRegistry for PrometheusRegistry {
    fn each(&self, visitor: &mut dyn FnMut(&str, MetricSnapshot)) {
        for family in self.inner.gather() {
            for metric in family.get_metric() {
                let name = Self::series_name(family.get_name(), metric.get_label());
                visitor(&name, Self::snapshot(&family, metric));
            }
        }
    }

    fn series_tags(&self) -> MetricTags {
        let mut tags = MetricTags::new();
        for family in self.inner.gather() {
            for metric in family.get_metric() {
                let labels = metric.get_label();
                if labels.is_empty() {
                    continue;
                }
                let pairs: BTreeMap<String, String> = labels
                    .iter()
                    .map(|label| (label.get_name().to_string(), label.get_value().to_string()))
                    .collect();
                tags.insert(Self::series_name(family.get_name(), labels), pairs);
            }
        }
        tags
    }
}
