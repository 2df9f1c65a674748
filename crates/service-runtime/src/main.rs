//! # Service Runtime
//!
//! Entry point for a service built on the shared bootstrap.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging
//! 2. Load configuration (environment)
//! 3. Seed the dependency container and start metrics reporting
//! 4. Run until Ctrl+C, then shut down gracefully

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use service_runtime::{RuntimeConfig, ServiceRuntime};
use service_telemetry::init_logging;
use shared_bus::{InMemoryMessageBus, MessageClient};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    // Single-process deployment: metrics stay on the in-memory bus.
    let message_client: Arc<dyn MessageClient> = Arc::new(InMemoryMessageBus::new());

    let runtime = ServiceRuntime::bootstrap(config, message_client)?;
    runtime.start()?;

    info!(service = %runtime.service_name(), "Service is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
