//! The mailer facade.

use mailpost_message::Email;
use tracing::{debug, warn};

use crate::backend::{BackendRegistry, DummyTransport};
use crate::config::{MailerOptions, Settings};
use crate::error::Result;
use crate::transport::Transport;

/// A configured mailer bound to one settings prefix.
///
/// Construction reads the prefixed options once; the resolved transport is
/// immutable for the mailer's lifetime.
pub struct Mailer {
    prefix: String,
    transport: Box<dyn Transport>,
}

impl Mailer {
    /// Resolves a mailer from prefix-scoped settings.
    ///
    /// Missing options are seeded with their defaults. In testing mode the
    /// capture backend is substituted unconditionally — a broken backend
    /// configuration must never block test execution.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the configured backend cannot be
    /// resolved or constructed (outside testing mode).
    pub fn from_settings(
        settings: &mut Settings,
        prefix: &str,
        backends: &BackendRegistry,
    ) -> Result<Self> {
        let options = MailerOptions::from_settings(settings, prefix)?;

        let resolved = backends.resolve(&options.backend, &options.backend_options());
        let transport: Box<dyn Transport> = match resolved {
            Ok(transport) => transport,
            Err(err) if options.testing => {
                warn!(
                    backend = %options.backend,
                    error = %err,
                    "backend unusable in testing mode, capturing instead"
                );
                Box::new(DummyTransport::new())
            }
            Err(err) => return Err(err),
        };

        debug!(prefix = %prefix, backend = transport.name(), "mailer initialized");
        Ok(Self {
            prefix: prefix.to_string(),
            transport,
        })
    }

    /// Wraps an already-built transport; the dependency-injection entry
    /// point for custom backends and tests.
    pub fn with_transport(prefix: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            prefix: prefix.into(),
            transport,
        }
    }

    /// The settings prefix this mailer was configured from.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The resolved transport.
    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Sends a message, surfacing any failure.
    ///
    /// # Errors
    ///
    /// Propagates validation and delivery errors from the transport.
    pub async fn send(&self, email: &mut Email) -> Result<()> {
        self.transport.send(email).await
    }

    /// Sends a message, absorbing delivery failures.
    ///
    /// # Errors
    ///
    /// Propagates validation errors; delivery errors are swallowed.
    pub async fn send_quiet(&self, email: &mut Email) -> Result<()> {
        self.transport.send_quiet(email).await
    }
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("prefix", &self.prefix)
            .field("backend", &self.transport.name())
            .finish()
    }
}
