//! Credentials provider backed by configuration.

use std::collections::BTreeMap;

use shared_types::{Credentials, CredentialsError, CredentialsProvider, Database};
use tracing::debug;

/// Serves credentials loaded at bootstrap, keyed by database name.
#[derive(Debug, Default)]
pub struct ConfiguredCredentials {
    by_database: BTreeMap<String, Credentials>,
}

impl ConfiguredCredentials {
    pub fn new(by_database: BTreeMap<String, Credentials>) -> Self {
        Self { by_database }
    }
}

impl CredentialsProvider for ConfiguredCredentials {
    fn get_database_credentials(&self, database: &Database) -> Result<Credentials, CredentialsError> {
        let credentials = self.by_database.get(&database.name).ok_or_else(|| {
            CredentialsError::NotFound {
                database: database.name.clone(),
            }
        })?;
        if credentials.is_empty() {
            return Err(CredentialsError::Invalid {
                database: database.name.clone(),
                reason: "username and password must be set".to_string(),
            });
        }
        debug!(database = %database.name, address = %database.address(), "Resolved database credentials");
        Ok(credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database(name: &str) -> Database {
        Database {
            db_type: "postgres".into(),
            host: "localhost".into(),
            port: 5432,
            name: name.into(),
            timeout: String::new(),
        }
    }

    #[test]
    fn test_lookup() {
        let mut map = BTreeMap::new();
        map.insert("metadata".to_string(), Credentials::new("meta", "pw"));
        map.insert("empty".to_string(), Credentials::new("meta", ""));
        let provider = ConfiguredCredentials::new(map);

        assert_eq!(
            provider.get_database_credentials(&database("metadata")).unwrap(),
            Credentials::new("meta", "pw")
        );
        assert!(matches!(
            provider.get_database_credentials(&database("core")),
            Err(CredentialsError::NotFound { .. })
        ));
        assert!(matches!(
            provider.get_database_credentials(&database("empty")),
            Err(CredentialsError::Invalid { .. })
        ));
    }
}
