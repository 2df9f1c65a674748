//! # Service Telemetry
//!
//! Metrics reporting and logging for services.
//!
//! ## Components
//!
//! - **Registry**: in-process counters, gauges and timers (plus an adapter
//!   over a `prometheus::Registry`)
//! - **Reporter**: turns each enabled metric into a tagged message and
//!   publishes it through a `MessageClient`
//! - **Manager**: owns the registry and runs the reporter on the configured
//!   interval
//! - **Logging**: `tracing-subscriber` setup, pretty or JSON
//!
//! ## Usage
//!
//! ```rust,ignore
//! use service_telemetry::{init_logging, LoggingConfig, MessageBusReporter, MetricsManager};
//!
//! init_logging(&LoggingConfig::from_env())?;
//!
//! let config = SharedTelemetryConfig::new(TelemetryInfo::from_env()?);
//! let reporter = Arc::new(MessageBusReporter::new("core", message_client, config.clone()));
//! let manager = Arc::new(MetricsManager::new(reporter, config));
//!
//! manager.registry().counter("requests.total")?.inc(1);
//! let handle = manager.clone().run(shutdown_rx)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SVC_SERVICE_NAME` | `core-service` | Service name in topics and tags |
//! | `SVC_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honored) |
//! | `SVC_JSON_LOGS` | `false` | JSON log lines |
//! | `SVC_TELEMETRY_INTERVAL` | `30s` | Report period, `0s` disables |
//! | `SVC_TELEMETRY_PUBLISH_TOPIC_PREFIX` | `edgex/telemetry` | Topic prefix |
//! | `SVC_TELEMETRY_TAGS` | | Static tags, `k=v,k=v` |
//! | `SVC_TELEMETRY_METRICS` | | Enabled metric prefixes, `name=true,...` |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod container;
pub mod dto;
pub mod logging;
pub mod manager;
pub mod registry;
pub mod reporter;

use thiserror::Error;

pub use config::{
    parse_duration, ConfigError, LoggingConfig, SharedTelemetryConfig, TelemetryInfo,
    DEFAULT_INTERVAL, DEFAULT_PUBLISH_TOPIC_PREFIX,
};
pub use container::{
    metrics_manager_from, metrics_manager_key, telemetry_config_from, telemetry_config_key,
};
pub use dto::{
    build_metric_tags, FieldValue, Metric, MetricField, MetricTag, MetricValidationError,
    API_VERSION,
};
pub use logging::init_logging;
pub use manager::{ManagerError, MetricsManager};
pub use registry::{
    Counter, Gauge, GaugeFloat64, Histogram, Instrument, Meter, MetricSnapshot, MetricTags,
    MetricsRegistry, PrometheusRegistry, Registry, RegistryError, Timer,
};
pub use reporter::{
    MessageBusReporter, MetricFailure, MetricsReporter, ReportError, ReportSummary, SERVICE_TAG,
};

/// Telemetry setup errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
