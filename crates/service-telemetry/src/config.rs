//! Telemetry and logging configuration from environment variables.
//!
//! `TelemetryInfo` is the writable part of a service's configuration: it can
//! be replaced at runtime through [`SharedTelemetryConfig::update`], and the
//! reporter and manager pick the change up on their next cycle.

use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// Default report interval.
pub const DEFAULT_INTERVAL: &str = "30s";

/// Default publish topic prefix.
pub const DEFAULT_PUBLISH_TOPIC_PREFIX: &str = "edgex/telemetry";

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid duration '{value}' (expected e.g. 30s, 500ms, 1m30s, 2h)")]
    InvalidDuration { value: String },

    #[error("Invalid entry '{entry}' in {var} (expected name=value)")]
    InvalidPair { var: String, entry: String },

    #[error("Invalid boolean '{value}' for '{key}' in {var}")]
    InvalidBool {
        var: String,
        key: String,
        value: String,
    },
}

/// Telemetry settings for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TelemetryInfo {
    /// Report period as a duration string. `0s` disables reporting.
    pub interval: String,
    /// Prefix of every publish topic.
    pub publish_topic_prefix: String,
    /// Metric name prefix → enabled.
    pub metrics: BTreeMap<String, bool>,
    /// Static tags added to every reported metric.
    pub tags: BTreeMap<String, String>,
}

impl Default for TelemetryInfo {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL.to_string(),
            publish_topic_prefix: DEFAULT_PUBLISH_TOPIC_PREFIX.to_string(),
            metrics: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }
}

impl TelemetryInfo {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SVC_TELEMETRY_INTERVAL`: report period (default: 30s)
    /// - `SVC_TELEMETRY_PUBLISH_TOPIC_PREFIX`: topic prefix (default: edgex/telemetry)
    /// - `SVC_TELEMETRY_METRICS`: `name=true,other=false`
    /// - `SVC_TELEMETRY_TAGS`: `env=prod,region=eu`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut info = Self::default();

        if let Some(interval) = lookup("SVC_TELEMETRY_INTERVAL") {
            parse_duration(&interval)?;
            info.interval = interval;
        }
        if let Some(prefix) = lookup("SVC_TELEMETRY_PUBLISH_TOPIC_PREFIX") {
            info.publish_topic_prefix = prefix;
        }
        if let Some(raw) = lookup("SVC_TELEMETRY_METRICS") {
            for (key, value) in parse_pairs("SVC_TELEMETRY_METRICS", &raw)? {
                let enabled = parse_bool(&value).ok_or_else(|| ConfigError::InvalidBool {
                    var: "SVC_TELEMETRY_METRICS".to_string(),
                    key: key.clone(),
                    value: value.clone(),
                })?;
                info.metrics.insert(key, enabled);
            }
        }
        if let Some(raw) = lookup("SVC_TELEMETRY_TAGS") {
            info.tags.extend(parse_pairs("SVC_TELEMETRY_TAGS", &raw)?);
        }

        Ok(info)
    }

    /// Report period.
    pub fn interval_duration(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.interval)
    }

    /// Whether `metric_name` should be reported.
    ///
    /// Configured names match as prefixes, so one entry can switch a whole
    /// family of metrics. The longest matching entry decides; a name with no
    /// matching entry is disabled.
    #[must_use]
    pub fn metric_enabled(&self, metric_name: &str) -> bool {
        self.metrics
            .iter()
            .filter(|(prefix, _)| metric_name.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(false, |(_, enabled)| *enabled)
    }
}

/// Live, shareable handle to a service's `TelemetryInfo`.
///
/// Readers always see a complete configuration. Writers notify subscribers
/// so long-running loops can re-arm timers.
#[derive(Clone)]
pub struct SharedTelemetryConfig {
    inner: Arc<SharedInner>,
}

struct SharedInner {
    info: RwLock<TelemetryInfo>,
    changed: watch::Sender<u64>,
}

impl SharedTelemetryConfig {
    /// Wrap an initial configuration.
    #[must_use]
    pub fn new(info: TelemetryInfo) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            inner: Arc::new(SharedInner {
                info: RwLock::new(info),
                changed,
            }),
        }
    }

    /// Copy of the current configuration.
    #[must_use]
    pub fn snapshot(&self) -> TelemetryInfo {
        self.inner.info.read().clone()
    }

    /// Replace the configuration and notify subscribers.
    pub fn update(&self, info: TelemetryInfo) {
        *self.inner.info.write() = info;
        self.inner.changed.send_modify(|generation| *generation += 1);
    }

    /// Edit the configuration in place and notify subscribers.
    pub fn modify<F: FnOnce(&mut TelemetryInfo)>(&self, edit: F) {
        edit(&mut self.inner.info.write());
        self.inner.changed.send_modify(|generation| *generation += 1);
    }

    /// Receiver that is marked changed on every update.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changed.subscribe()
    }

    /// Number of updates applied so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.inner.changed.borrow()
    }

    /// Live check of [`TelemetryInfo::metric_enabled`].
    #[must_use]
    pub fn metric_enabled(&self, metric_name: &str) -> bool {
        self.inner.info.read().metric_enabled(metric_name)
    }
}

impl Default for SharedTelemetryConfig {
    fn default() -> Self {
        Self::new(TelemetryInfo::default())
    }
}

impl std::fmt::Debug for SharedTelemetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTelemetryConfig")
            .field("info", &*self.inner.info.read())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Logging setup.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Service name attached to startup logs.
    pub service_name: String,
    /// Log level filter (trace, debug, info, warn, error), used when
    /// `RUST_LOG` is not set.
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            service_name: "core-service".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl LoggingConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SVC_SERVICE_NAME`: service name (default: core-service)
    /// - `SVC_LOG_LEVEL` or `RUST_LOG`: log level (default: info)
    /// - `SVC_JSON_LOGS`: JSON output (default: false, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("SVC_SERVICE_NAME")
                .unwrap_or_else(|_| "core-service".to_string()),

            log_level: env::var("SVC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("SVC_JSON_LOGS")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(is_container),
        }
    }
}

/// Parse a duration such as `30s`, `500ms`, `1m30s` or `2h`. A bare number
/// is taken as seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    let value = raw.trim();
    let parsed = match value.parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => humantime::parse_duration(value),
    };
    parsed.map_err(|_| ConfigError::InvalidDuration {
        value: raw.to_string(),
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_pairs(var: &str, raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| ConfigError::InvalidPair {
                    var: var.to_string(),
                    entry: entry.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let info = TelemetryInfo::default();
        assert_eq!(info.interval_duration(), Ok(Duration::from_secs(30)));
        assert_eq!(info.publish_topic_prefix, "edgex/telemetry");
        assert!(!info.metric_enabled("anything"));
    }

    #[test]
    fn test_from_lookup() {
        let info = TelemetryInfo::from_lookup(lookup(&[
            ("SVC_TELEMETRY_INTERVAL", "500ms"),
            ("SVC_TELEMETRY_PUBLISH_TOPIC_PREFIX", "site/metrics"),
            ("SVC_TELEMETRY_METRICS", "requests=true, queue=false"),
            ("SVC_TELEMETRY_TAGS", "env=prod,region=eu"),
        ]))
        .unwrap();

        assert_eq!(info.interval_duration(), Ok(Duration::from_millis(500)));
        assert_eq!(info.publish_topic_prefix, "site/metrics");
        assert_eq!(info.metrics.get("requests"), Some(&true));
        assert_eq!(info.metrics.get("queue"), Some(&false));
        assert_eq!(info.tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(info.tags.len(), 2);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        assert!(matches!(
            TelemetryInfo::from_lookup(lookup(&[("SVC_TELEMETRY_INTERVAL", "soon")])),
            Err(ConfigError::InvalidDuration { .. })
        ));
        assert!(matches!(
            TelemetryInfo::from_lookup(lookup(&[("SVC_TELEMETRY_TAGS", "env")])),
            Err(ConfigError::InvalidPair { .. })
        ));
        assert!(matches!(
            TelemetryInfo::from_lookup(lookup(&[("SVC_TELEMETRY_METRICS", "a=maybe")])),
            Err(ConfigError::InvalidBool { .. })
        ));
    }

    #[test]
    fn test_metric_enabled_prefix_and_longest_match() {
        let mut info = TelemetryInfo::default();
        info.metrics.insert("pipeline".into(), true);
        info.metrics.insert("pipeline.errors".into(), false);
        info.metrics.insert("requests.total".into(), true);

        assert!(info.metric_enabled("pipeline.latency"));
        assert!(!info.metric_enabled("pipeline.errors.count"));
        assert!(info.metric_enabled("requests.total"));
        assert!(!info.metric_enabled("requests"));
        assert!(!info.metric_enabled("unknown"));
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("0s"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("15us"), Ok(Duration::from_micros(15)));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("1.5s").is_err());
        assert!(parse_duration("5 parsecs").is_err());
    }

    #[test]
    fn test_parse_duration_compound() {
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5_400)));
        assert_eq!(parse_duration(" 2s500ms "), Ok(Duration::from_millis(2_500)));

        let info = TelemetryInfo::from_lookup(lookup(&[("SVC_TELEMETRY_INTERVAL", "1m30s")]))
            .unwrap();
        assert_eq!(info.interval_duration(), Ok(Duration::from_secs(90)));
    }

    #[test]
    fn test_shared_config_update_is_visible_and_notifies() {
        let shared = SharedTelemetryConfig::default();
        let mut changes = shared.subscribe();
        assert!(!changes.has_changed().unwrap());

        shared.modify(|info| {
            info.metrics.insert("requests".into(), true);
        });

        assert!(shared.metric_enabled("requests.total"));
        assert_eq!(shared.generation(), 1);
        assert!(changes.has_changed().unwrap());

        let clone = shared.clone();
        clone.update(TelemetryInfo::default());
        assert!(!shared.metric_enabled("requests.total"));
        assert_eq!(shared.generation(), 2);
    }

    #[test]
    fn test_deserialize_pascal_case() {
        let info: TelemetryInfo = serde_json::from_str(
            r#"{"Interval":"10s","PublishTopicPrefix":"p","Metrics":{"a":true},"Tags":{"k":"v"}}"#,
        )
        .unwrap();
        assert_eq!(info.interval, "10s");
        assert!(info.metric_enabled("a.b"));

        let partial: TelemetryInfo = serde_json::from_str(r#"{"Interval":"1s"}"#).unwrap();
        assert_eq!(partial.publish_topic_prefix, DEFAULT_PUBLISH_TOPIC_PREFIX);
    }
}
