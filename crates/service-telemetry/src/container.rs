//! Typed container accessors for telemetry services.

use std::sync::Arc;

use shared_container::{Container, ServiceKey};

use crate::config::SharedTelemetryConfig;
use crate::manager::MetricsManager;

/// Key of the service's `MetricsManager`.
#[must_use]
pub fn metrics_manager_key() -> ServiceKey {
    ServiceKey::of::<MetricsManager>()
}

/// Resolve the `MetricsManager`, or `None` if it was never seeded.
#[must_use]
pub fn metrics_manager_from(container: &Container) -> Option<Arc<MetricsManager>> {
    container.get_as::<Arc<MetricsManager>>(&metrics_manager_key())
}

/// Key of the live telemetry configuration.
#[must_use]
pub fn telemetry_config_key() -> ServiceKey {
    ServiceKey::of::<SharedTelemetryConfig>()
}

#[must_use]
pub fn telemetry_config_from(container: &Container) -> Option<SharedTelemetryConfig> {
    container.get_as::<SharedTelemetryConfig>(&telemetry_config_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::MessageBusReporter;
    use shared_bus::{InMemoryMessageBus, MessageClient};

    #[test]
    fn test_resolve_seeded_services() {
        let container = Container::new();
        assert!(metrics_manager_from(&container).is_none());
        assert!(telemetry_config_from(&container).is_none());

        let config = SharedTelemetryConfig::default();
        let client: Arc<dyn MessageClient> = Arc::new(InMemoryMessageBus::new());
        let reporter = Arc::new(MessageBusReporter::new("core", client, config.clone()));
        let manager = Arc::new(MetricsManager::new(reporter, config.clone()));

        container.set(telemetry_config_key(), config.clone());
        container.set(metrics_manager_key(), Arc::clone(&manager));

        let resolved = metrics_manager_from(&container).unwrap();
        assert!(Arc::ptr_eq(&resolved, &manager));

        // Same live handle: an update through one copy is seen by the other.
        config.modify(|info| info.interval = "5s".to_string());
        assert_eq!(telemetry_config_from(&container).unwrap().snapshot().interval, "5s");
    }

    #[test]
    fn test_wrong_type_under_key_is_absent() {
        let container = Container::new();
        container.set(metrics_manager_key(), "not a manager".to_string());
        assert!(metrics_manager_from(&container).is_none());
    }
}
