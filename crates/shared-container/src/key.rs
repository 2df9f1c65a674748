//! # Service Keys
//!
//! Deterministic lookup keys derived from a type identity.

use std::any::type_name;
use std::borrow::Borrow;
use std::fmt;

/// Separator between the type identity and the instance name.
pub const INSTANCE_SEPARATOR: char = '@';

/// Key under which a service instance is stored in the [`Container`].
///
/// The same type and instance name always produce the same key within a
/// build, so a key computed at `set` time matches every later lookup.
///
/// [`Container`]: crate::Container
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceKey(String);

impl ServiceKey {
    /// Key for the default instance of `T`.
    ///
    /// Keys come from [`std::any::type_name`], which is not guaranteed
    /// unique: two distinct types (e.g. the same type from two versions of
    /// one crate) can share a key. A lookup through
    /// [`Container::get_as`](crate::Container::get_as) then finds a value of
    /// the other type and returns `None`. Use [`ServiceKey::named`] to keep
    /// such types apart.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(type_name::<T>().to_string())
    }

    /// Key for a named instance of `T`.
    ///
    /// An empty name is the default instance.
    #[must_use]
    pub fn named<T: ?Sized + 'static>(instance: &str) -> Self {
        if instance.is_empty() {
            return Self::of::<T>();
        }
        Self(format!("{}{}{}", type_name::<T>(), INSTANCE_SEPARATOR, instance))
    }

    /// The full key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The type identity part of the key.
    #[must_use]
    pub fn type_identity(&self) -> &str {
        self.0
            .split_once(INSTANCE_SEPARATOR)
            .map_or(self.0.as_str(), |(ty, _)| ty)
    }

    /// The instance name, if this is a named key.
    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.0
            .split_once(INSTANCE_SEPARATOR)
            .map(|(_, instance)| instance)
    }
}

/// Derive the key for `T` with an optional instance name.
#[must_use]
pub fn key_for<T: ?Sized + 'static>(instance: Option<&str>) -> ServiceKey {
    match instance {
        Some(name) => ServiceKey::named::<T>(name),
        None => ServiceKey::of::<T>(),
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for ServiceKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl AsRef<str> for ServiceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}
