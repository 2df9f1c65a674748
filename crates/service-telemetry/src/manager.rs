//! # Metrics Manager
//!
//! Owns a service's metric registry and drives the reporter on a timer.
//!
//! ## Scheduling
//!
//! The reporting loop runs on one tokio task and awaits every cycle before
//! waiting for the next tick, so cycles never overlap. Ticks missed during a
//! slow cycle are skipped. The interval is re-read whenever the telemetry
//! configuration changes; an interval of zero (or one that does not parse)
//! pauses reporting until the configuration changes again.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::SharedTelemetryConfig;
use crate::registry::{Instrument, MetricTags, MetricsRegistry, Registry, RegistryError};
use crate::reporter::{MetricsReporter, ReportSummary};

/// Metrics manager errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManagerError {
    #[error("Metrics reporting loop is already running")]
    AlreadyRunning,

    #[error("Invalid metric name '{name}'")]
    InvalidName { name: String },

    #[error("Invalid tag name '{tag}' for metric '{metric}'")]
    InvalidTagName { metric: String, tag: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Metric and tag names may only use letters, digits, `_`, `.` and `-`.
fn valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Registry plus reporting schedule for one service.
pub struct MetricsManager {
    registry: Arc<Registry>,
    metric_tags: RwLock<MetricTags>,
    sources: RwLock<Vec<Arc<dyn MetricsRegistry>>>,
    reporter: Arc<dyn MetricsReporter>,
    config: SharedTelemetryConfig,
    running: AtomicBool,
}

impl MetricsManager {
    pub fn new(reporter: Arc<dyn MetricsReporter>, config: SharedTelemetryConfig) -> Self {
        Self::with_registry(Arc::new(Registry::new()), reporter, config)
    }

    pub fn with_registry(
        registry: Arc<Registry>,
        reporter: Arc<dyn MetricsReporter>,
        config: SharedTelemetryConfig,
    ) -> Self {
        Self {
            registry,
            metric_tags: RwLock::new(MetricTags::new()),
            sources: RwLock::new(Vec::new()),
            reporter,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// The managed registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Register `instrument` under `name` with optional per-metric tags.
    pub fn register(
        &self,
        name: &str,
        instrument: impl Into<Instrument>,
        tags: BTreeMap<String, String>,
    ) -> Result<(), ManagerError> {
        if !valid_identifier(name) {
            return Err(ManagerError::InvalidName {
                name: name.to_string(),
            });
        }
        if let Some(tag) = tags.keys().find(|tag| !valid_identifier(tag)) {
            return Err(ManagerError::InvalidTagName {
                metric: name.to_string(),
                tag: tag.clone(),
            });
        }

        self.registry.register(name, instrument)?;
        if !tags.is_empty() {
            self.metric_tags.write().insert(name.to_string(), tags);
        }
        debug!(metric = name, "Metric registered");
        Ok(())
    }

    /// Remove `name` and its tags. Returns whether it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.metric_tags.write().remove(name);
        self.registry.unregister(name).is_some()
    }

    /// Tags registered for `name`.
    #[must_use]
    pub fn tags_for(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.metric_tags.read().get(name).cloned()
    }

    /// Report an additional registry alongside the managed one.
    pub fn add_source(&self, source: Arc<dyn MetricsRegistry>) {
        self.sources.write().push(source);
    }

    /// Run one report cycle now.
    pub async fn report_now(&self) -> ReportSummary {
        let metric_tags = self.metric_tags.read().clone();
        let sources: Vec<Arc<dyn MetricsRegistry>> = self.sources.read().clone();

        let mut summary = self
            .reporter
            .report(self.registry.as_ref(), &metric_tags)
            .await;
        for source in sources {
            summary.merge(self.reporter.report(source.as_ref(), &MetricTags::new()).await);
        }
        summary
    }

    /// Whether the reporting loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the reporting loop. It stops when `shutdown` turns `true` or
    /// its sender is dropped.
    pub fn run(
        self: Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, ManagerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ManagerError::AlreadyRunning);
        }

        Ok(tokio::spawn(async move {
            self.reporting_loop(shutdown).await;
            self.running.store(false, Ordering::SeqCst);
            info!("Metrics reporting stopped");
        }))
    }

    fn current_interval(&self) -> Option<Duration> {
        match self.config.snapshot().interval_duration() {
            Ok(interval) if interval.is_zero() => None,
            Ok(interval) => Some(interval),
            Err(e) => {
                warn!(error = %e, "Telemetry interval invalid, reporting paused");
                None
            }
        }
    }

    async fn cycle(&self) {
        match self.report_now().await.into_result() {
            Ok(published) => debug!(published, "Metrics report cycle complete"),
            Err(e) => error!(error = %e, "Failed to report metrics"),
        }
    }

    async fn reporting_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut changes = self.config.subscribe();

        loop {
            if *shutdown.borrow() {
                return;
            }

            let interval = match self.current_interval() {
                Some(interval) => interval,
                None => {
                    info!("Metrics reporting disabled until configuration changes");
                    tokio::select! {
                        changed = changes.changed() => {
                            if changed.is_err() {
                                return;
                            }
                        }
                        res = shutdown.changed() => {
                            if res.is_err() {
                                return;
                            }
                        }
                    }
                    continue;
                }
            };

            info!(interval_ms = interval.as_millis() as u64, "Metrics reporting started");
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.cycle().await,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        if self.current_interval() != Some(interval) {
                            debug!("Telemetry interval changed, re-arming");
                            break;
                        }
                    }
                    res = shutdown.changed() => {
                        if res.is_err() || *shutdown.borrow() {
                            return;
                        }
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for MetricsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsManager")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
