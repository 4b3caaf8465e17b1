//! Delivery backends and their registry.

mod dummy;
mod smtp;

pub use dummy::DummyTransport;
pub use smtp::SmtpTransport;

use std::collections::HashMap;

use crate::config::{BackendOptions, DUMMY_BACKEND, SMTP_BACKEND};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Constructor turning a filtered option map into a transport.
pub type BackendFactory = fn(&BackendOptions) -> Result<Box<dyn Transport>>;

/// Explicit identifier-to-factory mapping.
///
/// Replaces resolve-a-class-from-a-path reflection: every usable backend is
/// registered up front under a plain string identifier.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in backends registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SMTP_BACKEND, SmtpTransport::factory);
        registry.register(DUMMY_BACKEND, DummyTransport::factory);
        registry
    }

    /// Registers a factory under an identifier, replacing any existing one.
    pub fn register(&mut self, name: &str, factory: BackendFactory) {
        self.factories.insert(name.to_lowercase(), factory);
    }

    /// True when a factory is registered under the identifier.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Constructs the backend registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBackend`] for an unregistered identifier, or
    /// the factory's own error.
    pub fn resolve(&self, name: &str, options: &BackendOptions) -> Result<Box<dyn Transport>> {
        let factory = self
            .factories
            .get(&name.to_lowercase())
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))?;
        factory(options)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_both_builtins() {
        let registry = BackendRegistry::with_defaults();
        assert!(registry.contains("smtp"));
        assert!(registry.contains("dummy"));
        assert!(registry.contains("SMTP")); // identifiers are case-insensitive
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let registry = BackendRegistry::with_defaults();
        let err = match registry.resolve("no.such.backend", &BackendOptions::new()) {
            Ok(_) => panic!("expected resolve to fail for an unknown backend"),
            Err(err) => err,
        };
        assert!(matches!(err, Error::UnknownBackend(_)));
    }

    #[test]
    fn resolve_constructs_the_named_backend() {
        let registry = BackendRegistry::with_defaults();
        let transport = registry.resolve("dummy", &BackendOptions::new()).unwrap();
        assert_eq!(transport.name(), "dummy");
    }

    #[test]
    fn custom_backends_can_be_registered() {
        let mut registry = BackendRegistry::new();
        assert!(!registry.contains("capture"));
        registry.register("capture", DummyTransport::factory);
        assert!(registry.contains("capture"));
    }
}
