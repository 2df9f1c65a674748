//! Process-wide `tracing` subscriber setup.
//!
//! JSON lines carry `timestamp`, `level`, `target`, `fields`, thread ids and
//! source locations, which log shippers can index without parsing messages.
//! The human-readable format is meant for local development.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::TelemetryError;

/// Build the level filter: `RUST_LOG` wins, then the configured level.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed or the level filter does not
/// parse.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let env_filter = env_filter(config)?;

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_rejects_garbage() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            log_level: "service=loudest".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            env_filter(&config),
            Err(TelemetryError::LoggingInit(_))
        ));
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        // Whichever test installs first wins; the second install must fail.
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
