//! Handler registry keyed by `(name, version)`
//!
//! Both runtimes look handlers up by the type carried in the polled task.
//! The key format `"{name}==>{version}"` is shared by workflows and activities.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Build the lookup key for a `(name, version)` pair
pub fn registration_key(name: &str, version: &str) -> String {
    format!("{name}==>{version}")
}

/// Errors from registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No handler registered under the key
    #[error("no handler registered for {0}")]
    NotRegistered(String),
}

/// Registry of type-erased handlers
pub struct HandlerRegistry<H: ?Sized> {
    handlers: HashMap<String, Arc<H>>,
}

impl<H: ?Sized> Default for HandlerRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> HandlerRegistry<H> {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any previous one with the same key
    pub fn register(&mut self, name: &str, version: &str, handler: Arc<H>) {
        self.handlers
            .insert(registration_key(name, version), handler);
    }

    /// Look up the handler for a `(name, version)` pair
    pub fn lookup(&self, name: &str, version: &str) -> Result<Arc<H>, RegistryError> {
        let key = registration_key(name, version);
        self.handlers
            .get(&key)
            .cloned()
            .ok_or(RegistryError::NotRegistered(key))
    }

    /// Check if a handler is registered
    pub fn contains(&self, name: &str, version: &str) -> bool {
        self.handlers.contains_key(&registration_key(name, version))
    }

    /// Get the number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Get all registration keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(|s| s.as_str())
    }
}

impl<H: ?Sized> fmt::Debug for HandlerRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("keys", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(registration_key("getnum", "1"), "getnum==>1");
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry: HandlerRegistry<str> = HandlerRegistry::new();
        registry.register("getnum", "1", Arc::from("v1"));
        registry.register("getnum", "2", Arc::from("v2"));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("getnum", "1"));
        assert_eq!(&*registry.lookup("getnum", "2").unwrap(), "v2");
    }

    #[test]
    fn test_unknown_handler() {
        let registry: HandlerRegistry<str> = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.lookup("missing", "1"),
            Err(RegistryError::NotRegistered("missing==>1".to_string()))
        );
    }

    #[test]
    fn test_registry_debug() {
        let mut registry: HandlerRegistry<str> = HandlerRegistry::new();
        registry.register("sum", "3", Arc::from("x"));

        let debug_str = format!("{:?}", registry);
        assert!(debug_str.contains("sum==>3"));
    }
}
