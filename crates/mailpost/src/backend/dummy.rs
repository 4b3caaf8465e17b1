//! In-memory capture backend for tests.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use mailpost_message::Email;

use crate::config::BackendOptions;
use crate::error::Result;
use crate::transport::Transport;

/// Capture transport: every sent message lands in an observable outbox.
///
/// Clones share the same outbox, so a test can hold one handle while the
/// mailer owns another.
#[derive(Debug, Clone, Default)]
pub struct DummyTransport {
    outbox: Arc<Mutex<Vec<Email>>>,
}

impl DummyTransport {
    /// Creates a capture transport with an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend factory; the option map is accepted and ignored.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn factory(_options: &BackendOptions) -> Result<Box<dyn Transport>> {
        Ok(Box::new(Self::new()))
    }

    /// A snapshot of every captured message, oldest first.
    #[must_use]
    pub fn outbox(&self) -> Vec<Email> {
        self.lock().clone()
    }

    /// Number of captured messages.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.lock().len()
    }

    /// Empties the outbox.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Email>> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for DummyTransport {
    async fn send(&self, email: &mut Email) -> Result<()> {
        self.lock().push(email.clone());
        Ok(())
    }

    /// Capture has nothing to swallow; identical to [`Self::send`].
    async fn send_quiet(&self, email: &mut Email) -> Result<()> {
        self.send(email).await
    }

    fn name(&self) -> &'static str {
        "dummy"
    }

    fn as_any(&self) -> &dyn Any {
        self
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

    #[tokio::test]
    async fn send_appends_exactly_one_entry() {
        let transport = DummyTransport::new();
        let mut mail = Email::new("hi", "body");

        transport.send(&mut mail).await.unwrap();
        assert_eq!(transport.sent_count(), 1);

        transport.send(&mut mail).await.unwrap();
        assert_eq!(transport.sent_count(), 2);
    }

    #[tokio::test]
    async fn send_quiet_also_captures() {
        let transport = DummyTransport::new();
        let mut mail = Email::new("hi", "body");
        transport.send_quiet(&mut mail).await.unwrap();
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn clones_share_the_outbox() {
        let transport = DummyTransport::new();
        let observer = transport.clone();

        let mut mail = Email::new("hi", "body");
        transport.send(&mut mail).await.unwrap();
        assert_eq!(observer.sent_count(), 1);

        observer.clear();
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn outbox_preserves_message_fields() {
        let transport = DummyTransport::new();
        let mut mail = Email::new("subject line", "body text");
        mail.add_to("you@example.com").unwrap();
        transport.send(&mut mail).await.unwrap();

        let outbox = transport.outbox();
        assert_eq!(outbox[0].subject().as_str(), "subject line");
        assert_eq!(outbox[0].to().len(), 1);
    }
}
