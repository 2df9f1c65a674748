//! # Service Runtime Library
//!
//! Bootstrap wiring shared by service binaries and their tests.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (environment)
//! 2. Seed the container: message client, telemetry configuration,
//!    credentials provider, then the metrics manager built from the first two
//! 3. Start the metrics reporting loop
//! 4. On shutdown, stop the loop and flush one last report

pub mod config;
pub mod credentials;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use service_telemetry::{
    metrics_manager_from, metrics_manager_key, telemetry_config_from, telemetry_config_key,
    MessageBusReporter, MetricsManager, SharedTelemetryConfig,
};
use shared_bus::{message_client_from, message_client_key, MessageClient};
use shared_container::{Container, ServiceMap};
use shared_types::{credentials_provider_key, CredentialsProvider};

pub use config::{RuntimeConfig, RuntimeConfigError};
pub use credentials::ConfiguredCredentials;

/// Name of the counter incremented once per bootstrap.
pub const BOOTSTRAP_COUNTER: &str = "runtime.bootstraps";
/// Name of the timer recording how long bootstrap took.
pub const BOOTSTRAP_TIMER: &str = "runtime.bootstrap.duration";

/// A bootstrapped service.
pub struct ServiceRuntime {
    container: Arc<Container>,
    service_name: String,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    reporting: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceRuntime {
    /// Seed a fresh container from `config` and `message_client`.
    pub fn bootstrap(config: RuntimeConfig, message_client: Arc<dyn MessageClient>) -> Result<Self> {
        let started = Instant::now();
        let service_name = config.service_name().to_string();
        info!(service = %service_name, "Bootstrapping service");

        let telemetry = SharedTelemetryConfig::new(config.telemetry);
        let credentials: Arc<dyn CredentialsProvider> =
            Arc::new(ConfiguredCredentials::new(config.credentials));

        let container = Arc::new(Container::with_services(
            ServiceMap::new()
                .with(message_client_key(), message_client)
                .with(telemetry_config_key(), telemetry)
                .with(credentials_provider_key(), credentials),
        ));
        container.set(
            metrics_manager_key(),
            build_metrics_manager(&container, &service_name)?,
        );

        let manager = metrics_manager_from(&container)
            .context("Metrics manager missing from container")?;
        manager
            .registry()
            .counter(BOOTSTRAP_COUNTER)
            .context("Failed to register bootstrap counter")?
            .inc(1);
        manager
            .registry()
            .timer(BOOTSTRAP_TIMER)
            .context("Failed to register bootstrap timer")?
            .update_since(started);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        info!(service = %service_name, services = container.len(), "Container seeded");

        Ok(Self {
            container,
            service_name,
            shutdown_tx,
            shutdown_rx,
            reporting: Mutex::new(None),
        })
    }

    /// Start the metrics reporting loop.
    pub fn start(&self) -> Result<()> {
        let manager = self.metrics_manager()?;
        let handle = manager
            .run(self.shutdown_rx.clone())
            .context("Failed to start metrics reporting")?;
        *self.reporting.lock() = Some(handle);

        info!(service = %self.service_name, "Service running");
        Ok(())
    }

    /// Stop reporting and publish a final report.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let handle = self.reporting.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Metrics reporting task failed: {}", e);
            }
        }

        match self.metrics_manager() {
            Ok(manager) => {
                if let Err(e) = manager.report_now().await.into_result() {
                    warn!(error = %e, "Final metrics report incomplete");
                }
            }
            Err(e) => warn!(error = %e, "No metrics manager for final report"),
        }

        info!("Shutdown complete");
    }

    /// The service's dependency container.
    #[must_use]
    pub fn container(&self) -> Arc<Container> {
        Arc::clone(&self.container)
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn metrics_manager(&self) -> Result<Arc<MetricsManager>> {
        metrics_manager_from(&self.container).context("Metrics manager missing from container")
    }
}

/// Construct the metrics manager from services already in `container`.
fn build_metrics_manager(container: &Container, service_name: &str) -> Result<Arc<MetricsManager>> {
    let client = message_client_from(container).context("No message client in container")?;
    let config =
        telemetry_config_from(container).context("No telemetry configuration in container")?;
    let reporter = Arc::new(MessageBusReporter::new(service_name, client, config.clone()));
    Ok(Arc::new(MetricsManager::new(reporter, config)))
}
