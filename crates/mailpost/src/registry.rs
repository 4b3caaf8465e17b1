//! Prefix-keyed mailer registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mailer::Mailer;

/// Holds the application's configured mailers, keyed by settings prefix.
///
/// An explicit, dependency-injected object rather than ambient global
/// state: create one per application, register each mailer once, and
/// [`MailerRegistry::clear`] between tests.
#[derive(Debug, Default)]
pub struct MailerRegistry {
    mailers: HashMap<String, Arc<Mailer>>,
}

impl MailerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mailer under its prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateMailer`] when the prefix is taken.
    pub fn register(&mut self, mailer: Mailer) -> Result<Arc<Mailer>> {
        let prefix = mailer.prefix().to_string();
        if self.mailers.contains_key(&prefix) {
            return Err(Error::DuplicateMailer(prefix));
        }

        let mailer = Arc::new(mailer);
        self.mailers.insert(prefix, Arc::clone(&mailer));
        Ok(mailer)
    }

    /// Looks up the mailer registered under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMailer`] when nothing is registered there.
    pub fn get(&self, prefix: &str) -> Result<Arc<Mailer>> {
        self.mailers
            .get(prefix)
            .cloned()
            .ok_or_else(|| Error::MissingMailer(prefix.to_string()))
    }

    /// Removes and returns the mailer registered under `prefix`.
    pub fn remove(&mut self, prefix: &str) -> Option<Arc<Mailer>> {
        self.mailers.remove(prefix)
    }

    /// Drops every registration; the explicit test-reset lifecycle step.
    pub fn clear(&mut self) {
        self.mailers.clear();
    }

    /// Number of registered mailers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mailers.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mailers.is_empty()
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
    use crate::backend::DummyTransport;

    fn dummy_mailer(prefix: &str) -> Mailer {
        Mailer::with_transport(prefix, Box::new(DummyTransport::new()))
    }

    #[test]
    fn register_and_get() {
        let mut registry = MailerRegistry::new();
        registry.register(dummy_mailer("MAILER")).unwrap();
        assert_eq!(registry.get("MAILER").unwrap().prefix(), "MAILER");
    }

    #[test]
    fn duplicate_prefix_is_rejected() {
        let mut registry = MailerRegistry::new();
        registry.register(dummy_mailer("MAILER")).unwrap();
        let err = registry.register(dummy_mailer("MAILER")).unwrap_err();
        assert!(matches!(err, Error::DuplicateMailer(_)));
    }

    #[test]
    fn missing_prefix_is_an_error() {
        let registry = MailerRegistry::new();
        assert!(matches!(
            registry.get("MAILER").unwrap_err(),
            Error::MissingMailer(_)
        ));
    }

    #[test]
    fn multiple_prefixes_coexist() {
        let mut registry = MailerRegistry::new();
        registry.register(dummy_mailer("MAILER")).unwrap();
        registry.register(dummy_mailer("BULK")).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn clear_resets_the_registry() {
        let mut registry = MailerRegistry::new();
        registry.register(dummy_mailer("MAILER")).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        // A fresh registration after clear succeeds.
        registry.register(dummy_mailer("MAILER")).unwrap();
    }
}
