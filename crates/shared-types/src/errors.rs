//! # Error Types
//!
//! Errors surfaced by credentials providers.

use thiserror::Error;

/// Errors a [`CredentialsProvider`](crate::CredentialsProvider) can return.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialsError {
    /// No credentials are stored for the database.
    #[error("No credentials found for database '{database}'")]
    NotFound { database: String },

    /// The secret store could not be reached or refused the request.
    #[error("Secret store unavailable: {0}")]
    StoreUnavailable(String),

    /// Credentials were found but are unusable.
    #[error("Invalid credentials for database '{database}': {reason}")]
    Invalid { database: String, reason: String },
}
