//! Typed container accessors for the ports defined in this crate.

use std::sync::Arc;

use shared_container::{Container, ServiceKey};

use crate::credentials::CredentialsProvider;

/// Key of the `CredentialsProvider` instance in the container.
#[must_use]
pub fn credentials_provider_key() -> ServiceKey {
    ServiceKey::of::<dyn CredentialsProvider>()
}

/// Resolve the `CredentialsProvider`, or `None` if it was never seeded.
#[must_use]
pub fn credentials_provider_from(container: &Container) -> Option<Arc<dyn CredentialsProvider>> {
    container.get_as::<Arc<dyn CredentialsProvider>>(&credentials_provider_key())
}
