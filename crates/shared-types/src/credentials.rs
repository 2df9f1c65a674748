//! # Credentials
//!
//! Database descriptors and the port used to obtain their credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::CredentialsError;

/// Connection descriptor for a database a service depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Database {
    /// Backend type (e.g. `postgres`, `redisdb`).
    #[serde(rename = "Type")]
    pub db_type: String,
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Logical database name, also the secret name credentials live under.
    pub name: String,
    /// Connect timeout, as a duration string such as `"5s"`.
    #[serde(default)]
    pub timeout: String,
}

impl Database {
    /// `host:port` for this database.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Username/password pair.
///
/// `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Create a credentials pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// True if either part is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() || self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of database credentials (Driven Port).
///
/// Implemented by the secret-store bootstrap; consumed by any component that
/// opens a database connection.
pub trait CredentialsProvider: Send + Sync {
    /// Retrieve credentials for `database`.
    fn get_database_credentials(&self, database: &Database) -> Result<Credentials, CredentialsError>;
}
