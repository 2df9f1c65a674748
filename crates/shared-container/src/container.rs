//! # Container
//!
//! The key → instance store itself.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::key::ServiceKey;

/// Opaque, shareable service instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Constructor = Box<dyn Fn(&Container) -> Instance + Send + Sync>;

/// A constructor that runs once, on first lookup.
struct LazyService {
    construct: Constructor,
    instance: OnceLock<Instance>,
}

enum Entry {
    Ready(Instance),
    Lazy(Arc<LazyService>),
}

/// Batch of services applied under a single write lock.
///
/// ```rust,ignore
/// container.update(
///     ServiceMap::new()
///         .with(ServiceKey::of::<Config>(), config)
///         .with_factory(ServiceKey::of::<dyn MessageClient>(), |c| build_client(c)),
/// );
/// ```
#[derive(Default)]
pub struct ServiceMap {
    entries: Vec<(ServiceKey, Entry)>,
}

impl ServiceMap {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an already-constructed instance.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, key: ServiceKey, value: T) -> Self {
        self.entries.push((key, Entry::Ready(Arc::new(value))));
        self
    }

    /// Add a constructor that is run on first lookup.
    #[must_use]
    pub fn with_factory<T, F>(mut self, key: ServiceKey, construct: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.entries.push((key, lazy_entry(construct)));
        self
    }

    /// Number of services in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn lazy_entry<T, F>(construct: F) -> Entry
where
    T: Any + Send + Sync,
    F: Fn(&Container) -> T + Send + Sync + 'static,
{
    Entry::Lazy(Arc::new(LazyService {
        construct: Box::new(move |container| Arc::new(construct(container)) as Instance),
        instance: OnceLock::new(),
    }))
}

/// Type-keyed dependency container.
///
/// Explicit object, not a global: build one during bootstrap and hand it
/// (usually as `Arc<Container>`) to the code that needs dependencies.
#[derive(Default)]
pub struct Container {
    entries: RwLock<HashMap<ServiceKey, Entry>>,
}

impl Container {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container pre-seeded with `services`.
    #[must_use]
    pub fn with_services(services: ServiceMap) -> Self {
        let container = Self::new();
        container.update(services);
        container
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set<T: Any + Send + Sync>(&self, key: ServiceKey, value: T) {
        self.set_instance(key, Arc::new(value));
    }

    /// Store an already type-erased instance under `key`.
    pub fn set_instance(&self, key: ServiceKey, instance: Instance) {
        debug!(key = %key, "Service set");
        self.entries.write().insert(key, Entry::Ready(instance));
    }

    /// Store a constructor under `key`.
    ///
    /// The constructor runs once, on the first `get` of `key`, and may resolve
    /// other services from the container. It must not resolve `key` itself.
    pub fn set_factory<T, F>(&self, key: ServiceKey, construct: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        debug!(key = %key, "Service factory set");
        self.entries.write().insert(key, lazy_entry(construct));
    }

    /// Apply a batch of services under one write lock.
    pub fn update(&self, services: ServiceMap) {
        let mut entries = self.entries.write();
        for (key, entry) in services.entries {
            debug!(key = %key, "Service updated");
            entries.insert(key, entry);
        }
    }

    /// Look up the instance stored under `key`.
    ///
    /// Returns `None` if nothing was ever set under `key`.
    #[must_use]
    pub fn get(&self, key: &ServiceKey) -> Option<Instance> {
        let lazy = {
            let entries = self.entries.read();
            match entries.get(key)? {
                Entry::Ready(instance) => return Some(Arc::clone(instance)),
                Entry::Lazy(lazy) => Arc::clone(lazy),
            }
        };

        // Lock released: the constructor may call back into the container.
        let instance = lazy
            .instance
            .get_or_init(|| (lazy.construct)(self));
        Some(Arc::clone(instance))
    }

    /// Look up `key` and downcast to `T`.
    ///
    /// A stored value of another type yields `None`, same as a missing key.
    #[must_use]
    pub fn get_as<T: Any + Clone>(&self, key: &ServiceKey) -> Option<T> {
        let instance = self.get(key)?;
        let typed = instance.downcast_ref::<T>();
        if typed.is_none() {
            debug!(key = %key, expected = std::any::type_name::<T>(), "Service type mismatch");
        }
        typed.cloned()
    }

    /// True if something is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Remove and return whatever is stored under `key`.
    ///
    /// A constructor that never ran yields `None`.
    pub fn remove(&self, key: &ServiceKey) -> Option<Instance> {
        match self.entries.write().remove(key)? {
            Entry::Ready(instance) => Some(instance),
            Entry::Lazy(lazy) => lazy.instance.get().cloned(),
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Sorted snapshot of stored keys.
    #[must_use]
    pub fn keys(&self) -> Vec<ServiceKey> {
        let mut keys: Vec<ServiceKey> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("keys", &self.keys())
            .finish()
    }
}
