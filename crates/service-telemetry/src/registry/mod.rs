//! Metrics registries the reporter drains.
//!
//! A registry exposes one operation to the reporter: visit every metric with
//! a point-in-time snapshot of its value. Two implementations ship here:
//!
//! - [`Registry`]: name-ordered store of in-process instruments
//! - [`PrometheusRegistry`]: adapter over a `prometheus::Registry`

mod instruments;
mod prom;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::dto::MetricField;

pub use prom::PrometheusRegistry;
pub use instruments::{
    Counter, Gauge, GaugeFloat64, Histogram, HistogramSnapshot, Meter, MeterSnapshot, Timer,
    TimerGuard, TimerSnapshot,
};

/// Per-metric dynamic tags, keyed by metric name.
pub type MetricTags = BTreeMap<String, BTreeMap<String, String>>;

/// Field names used on the wire.
pub mod field {
    pub const COUNTER: &str = "counter";
    pub const GAUGE: &str = "gauge";
    pub const GAUGE_FLOAT64: &str = "gauge-float64";
    pub const TIMER: &str = "timer";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const MEAN: &str = "mean";
    pub const STDDEV: &str = "stddev";
    pub const VARIANCE: &str = "variance";
}

/// Point-in-time value of one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricSnapshot {
    Counter(i64),
    Gauge(i64),
    GaugeFloat64(f64),
    Timer(TimerSnapshot),
    Histogram(HistogramSnapshot),
    Meter(MeterSnapshot),
}

impl MetricSnapshot {
    /// Kind name, as used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Counter(_) => "counter",
            Self::Gauge(_) => "gauge",
            Self::GaugeFloat64(_) => "gauge-float64",
            Self::Timer(_) => "timer",
            Self::Histogram(_) => "histogram",
            Self::Meter(_) => "meter",
        }
    }

    /// Fields to publish, or `None` if this kind is not reportable.
    #[must_use]
    pub fn fields(&self) -> Option<Vec<MetricField>> {
        match *self {
            Self::Counter(count) => Some(vec![MetricField::new(field::COUNTER, count)]),
            Self::Gauge(value) => Some(vec![MetricField::new(field::GAUGE, value)]),
            Self::GaugeFloat64(value) => Some(vec![MetricField::new(field::GAUGE_FLOAT64, value)]),
            Self::Timer(timer) => Some(vec![
                MetricField::new(field::TIMER, timer.count),
                MetricField::new(field::MIN, timer.min),
                MetricField::new(field::MAX, timer.max),
                MetricField::new(field::MEAN, timer.mean),
                MetricField::new(field::STDDEV, timer.stddev),
                MetricField::new(field::VARIANCE, timer.variance),
            ]),
            Self::Histogram(_) | Self::Meter(_) => None,
        }
    }
}

/// Source of metric snapshots.
pub trait MetricsRegistry: Send + Sync {
    /// Call `visitor` once per metric with its current snapshot.
    fn each(&self, visitor: &mut dyn FnMut(&str, MetricSnapshot));

    /// Tags the registry itself attaches to its series, keyed by metric name.
    fn series_tags(&self) -> MetricTags {
        MetricTags::new()
    }
}

/// Registry operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("metric '{name}' is already registered")]
    Duplicate { name: String },

    #[error("metric '{name}' is registered as a {actual}")]
    KindMismatch { name: String, actual: &'static str },
}

/// A registered instrument.
#[derive(Debug, Clone)]
pub enum Instrument {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    GaugeFloat64(Arc<GaugeFloat64>),
    Timer(Arc<Timer>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
}

impl Instrument {
    #[must_use]
    pub fn snapshot(&self) -> MetricSnapshot {
        match self {
            Self::Counter(c) => MetricSnapshot::Counter(c.count()),
            Self::Gauge(g) => MetricSnapshot::Gauge(g.value()),
            Self::GaugeFloat64(g) => MetricSnapshot::GaugeFloat64(g.value()),
            Self::Timer(t) => MetricSnapshot::Timer(t.snapshot()),
            Self::Histogram(h) => MetricSnapshot::Histogram(h.snapshot()),
            Self::Meter(m) => MetricSnapshot::Meter(m.snapshot()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Counter(_) => "counter",
            Self::Gauge(_) => "gauge",
            Self::GaugeFloat64(_) => "gauge-float64",
            Self::Timer(_) => "timer",
            Self::Histogram(_) => "histogram",
            Self::Meter(_) => "meter",
        }
    }
}

macro_rules! instrument_from {
    ($($variant:ident),*) => {
        $(
            impl From<Arc<$variant>> for Instrument {
                fn from(value: Arc<$variant>) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

instrument_from!(Counter, Gauge, GaugeFloat64, Timer, Histogram, Meter);

macro_rules! get_or_register {
    ($fn_name:ident, $variant:ident) => {
        #[doc = concat!("Existing `", stringify!($variant), "` called `name`, or a new one.")]
        pub fn $fn_name(&self, name: &str) -> Result<Arc<$variant>, RegistryError> {
            let mut metrics = self.metrics.write();
            match metrics
                .entry(name.to_string())
                .or_insert_with(|| Instrument::$variant(Arc::new($variant::new())))
            {
                Instrument::$variant(existing) => Ok(Arc::clone(existing)),
                other => Err(RegistryError::KindMismatch {
                    name: name.to_string(),
                    actual: other.kind(),
                }),
            }
        }
    };
}

/// In-process metrics registry, iterated in name order.
#[derive(Debug, Default)]
pub struct Registry {
    metrics: RwLock<BTreeMap<String, Instrument>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `instrument` under `name`.
    pub fn register(
        &self,
        name: impl Into<String>,
        instrument: impl Into<Instrument>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut metrics = self.metrics.write();
        if metrics.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        metrics.insert(name, instrument.into());
        Ok(())
    }

    get_or_register!(counter, Counter);
    get_or_register!(gauge, Gauge);
    get_or_register!(gauge_float64, GaugeFloat64);
    get_or_register!(timer, Timer);
    get_or_register!(histogram, Histogram);
    get_or_register!(meter, Meter);

    /// Remove `name`, returning the instrument if it was registered.
    pub fn unregister(&self, name: &str) -> Option<Instrument> {
        self.metrics.write().remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Instrument> {
        self.metrics.read().get(name).cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.metrics.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }
}

impl MetricsRegistry for Registry {
    fn each(&self, visitor: &mut dyn FnMut(&str, MetricSnapshot)) {
        // Snapshot under the lock, visit after releasing it so a visitor may
        // register metrics of its own.
        let snapshots: Vec<(String, MetricSnapshot)> = self
            .metrics
            .read()
            .iter()
            .map(|(name, instrument)| (name.clone(), instrument.snapshot()))
            .collect();

        for (name, snapshot) in snapshots {
            visitor(&name, snapshot);
        }
    }
}
