//! Typed container accessors for message clients.

use std::sync::Arc;

use shared_container::{Container, ServiceKey};

use crate::publisher::MessageClient;

/// Key of the default `MessageClient` in the container.
#[must_use]
pub fn message_client_key() -> ServiceKey {
    ServiceKey::of::<dyn MessageClient>()
}

/// Key of a named `MessageClient`, for services talking to several buses.
#[must_use]
pub fn named_message_client_key(name: &str) -> ServiceKey {
    ServiceKey::named::<dyn MessageClient>(name)
}

/// Resolve the default `MessageClient`, or `None` if it was never seeded.
#[must_use]
pub fn message_client_from(container: &Container) -> Option<Arc<dyn MessageClient>> {
    container.get_as::<Arc<dyn MessageClient>>(&message_client_key())
}

/// Resolve a named `MessageClient`.
#[must_use]
pub fn named_message_client_from(container: &Container, name: &str) -> Option<Arc<dyn MessageClient>> {
    container.get_as::<Arc<dyn MessageClient>>(&named_message_client_key(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryMessageBus;

    #[test]
    fn test_message_client_from_empty_container() {
        assert!(message_client_from(&Container::new()).is_none());
    }

    #[test]
    fn test_default_and_named_clients_are_separate() {
        let container = Container::new();
        let client: Arc<dyn MessageClient> = Arc::new(InMemoryMessageBus::new());
        container.set(named_message_client_key("external"), client);

        assert!(message_client_from(&container).is_none());
        assert!(named_message_client_from(&container, "external").is_some());
    }

    #[test]
    fn test_concrete_type_under_key_is_not_a_client() {
        let container = Container::new();
        // Stored as the concrete type, not as `Arc<dyn MessageClient>`.
        container.set(message_client_key(), Arc::new(InMemoryMessageBus::new()));
        assert!(message_client_from(&container).is_none());
    }
}
