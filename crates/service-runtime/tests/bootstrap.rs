//! Bootstrap a service against the in-memory bus and watch its metrics.

use std::sync::Arc;
use std::time::Duration;

use service_runtime::{RuntimeConfig, ServiceRuntime, BOOTSTRAP_COUNTER};
use service_telemetry::{telemetry_config_from, FieldValue, Metric, TelemetryInfo};
use shared_bus::{InMemoryMessageBus, Subscription};

fn config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.logging.service_name = "device-virtual".to_string();
    config.telemetry = TelemetryInfo {
        interval: "1s".to_string(),
        metrics: [(BOOTSTRAP_COUNTER.to_string(), true)].into_iter().collect(),
        ..TelemetryInfo::default()
    };
    config
}

fn drain(subscription: &mut Subscription) -> Vec<Metric> {
    let mut metrics = Vec::new();
    while let Ok(Some(envelope)) = subscription.try_recv() {
        assert_eq!(
            envelope.received_topic,
            "edgex/telemetry/device-virtual/runtime.bootstraps"
        );
        metrics.push(envelope.decode_json().expect("metric JSON"));
    }
    metrics
}

#[tokio::test(start_paused = true)]
async fn test_reports_until_shutdown_then_flushes() {
    let bus = Arc::new(InMemoryMessageBus::new());
    let mut subscription = bus.subscribe(["edgex/telemetry/#"]).unwrap();

    let runtime = ServiceRuntime::bootstrap(config(), bus.clone()).unwrap();
    runtime.start().unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    runtime.shutdown().await;

    // Two ticks plus the final flush.
    let metrics = drain(&mut subscription);
    assert_eq!(metrics.len(), 3);
    for metric in &metrics {
        assert_eq!(metric.field("counter"), Some(FieldValue::Int(1)));
        assert_eq!(metric.tag_values("service"), ["device-virtual"]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_fails() {
    let runtime =
        ServiceRuntime::bootstrap(config(), Arc::new(InMemoryMessageBus::new())).unwrap();
    runtime.start().unwrap();

    let err = runtime.start().unwrap_err();
    assert!(format!("{err:#}").contains("already running"));

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_live_reload_through_container() {
    let bus = Arc::new(InMemoryMessageBus::new());
    let mut subscription = bus.subscribe(["#"]).unwrap();

    let runtime = ServiceRuntime::bootstrap(config(), bus.clone()).unwrap();
    runtime.start().unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(drain(&mut subscription).len(), 1);

    let telemetry = telemetry_config_from(&runtime.container()).unwrap();
    telemetry.modify(|info| {
        info.metrics.insert(BOOTSTRAP_COUNTER.to_string(), false);
    });

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(drain(&mut subscription).is_empty());

    runtime.shutdown().await;
}
