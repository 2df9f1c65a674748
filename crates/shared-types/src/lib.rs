//! # Shared Types Crate
//!
//! Value types and collaborator ports shared by every service.
//!
//! ## Contents
//!
//! - `Database` / `Credentials`: descriptors handed to the credentials port
//! - `CredentialsProvider`: driven port implemented by the secret store
//!   bootstrap (not by this workspace)
//! - `container`: typed accessors for resolving these ports from a
//!   [`shared_container::Container`]

pub mod container;
pub mod credentials;
pub mod errors;

pub use container::{credentials_provider_from, credentials_provider_key};
pub use credentials::{Credentials, CredentialsProvider, Database};
pub use errors::CredentialsError;
