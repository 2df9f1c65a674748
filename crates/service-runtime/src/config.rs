//! # Runtime Configuration
//!
//! Everything a service needs at bootstrap, read from the environment.

use std::collections::BTreeMap;
use std::env;

use service_telemetry::{ConfigError, LoggingConfig, TelemetryInfo};
use shared_types::Credentials;
use thiserror::Error;

/// Runtime configuration errors.
#[derive(Debug, Error)]
pub enum RuntimeConfigError {
    #[error(transparent)]
    Telemetry(#[from] ConfigError),

    #[error("Invalid entry '{entry}' in SVC_DATABASE_CREDENTIALS (expected name=user:password)")]
    InvalidCredentials { entry: String },
}

/// Complete service configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub logging: LoggingConfig,
    pub telemetry: TelemetryInfo,
    /// Database name → credentials.
    pub credentials: BTreeMap<String, Credentials>,
}

impl RuntimeConfig {
    /// Load from environment variables.
    ///
    /// Besides the logging and telemetry variables, reads
    /// `SVC_DATABASE_CREDENTIALS` as `name=user:password,...`.
    pub fn from_env() -> Result<Self, RuntimeConfigError> {
        Ok(Self {
            logging: LoggingConfig::from_env(),
            telemetry: TelemetryInfo::from_env()?,
            credentials: env::var("SVC_DATABASE_CREDENTIALS")
                .map(|raw| parse_credentials(&raw))
                .unwrap_or_else(|_| Ok(BTreeMap::new()))?,
        })
    }

    /// Name used in topics and the `service` tag.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.logging.service_name
    }
}

pub(crate) fn parse_credentials(
    raw: &str,
) -> Result<BTreeMap<String, Credentials>, RuntimeConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || RuntimeConfigError::InvalidCredentials {
                entry: entry.to_string(),
            };
            let (name, secret) = entry.split_once('=').ok_or_else(invalid)?;
            let (username, password) = secret.split_once(':').ok_or_else(invalid)?;
            if name.trim().is_empty() {
                return Err(invalid());
            }
            Ok((
                name.trim().to_string(),
                Credentials::new(username.trim(), password.trim()),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let parsed = parse_credentials("metadata=meta:pw1, core = svc:pw2").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["metadata"], Credentials::new("meta", "pw1"));
        assert_eq!(parsed["core"], Credentials::new("svc", "pw2"));
        assert!(parse_credentials("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_credentials_rejects_malformed() {
        for raw in ["metadata", "metadata=nopassword", "=u:p"] {
            assert!(
                matches!(
                    parse_credentials(raw),
                    Err(RuntimeConfigError::InvalidCredentials { .. })
                ),
                "accepted {raw}"
            );
        }
    }

    #[test]
    fn test_default_service_name() {
        assert_eq!(RuntimeConfig::default().service_name(), "core-service");
    }
}
