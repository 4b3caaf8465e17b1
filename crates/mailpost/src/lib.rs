//! # mailpost
//!
//! Mail delivery with swappable backends.
//!
//! This crate ties the pieces together:
//! - Prefix-scoped configuration read from the host application's settings
//! - A backend registry mapping identifiers to transport factories
//! - The [`Transport`] capability with SMTP and in-memory capture variants
//! - The [`Mailer`] facade and a prefix-keyed [`MailerRegistry`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailpost::{BackendRegistry, Email, Mailer, MailerRegistry, Settings};
//!
//! # async fn run() -> mailpost::Result<()> {
//! let mut settings = Settings::new();
//! settings.set("MAILER_HOST", "mx.example.com");
//! settings.set("MAILER_DEFAULT_SENDER", "webmaster@example.com");
//!
//! let backends = BackendRegistry::with_defaults();
//! let mailer = Mailer::from_settings(&mut settings, "MAILER", &backends)?;
//!
//! let mut registry = MailerRegistry::new();
//! let mailer = registry.register(mailer)?;
//!
//! let mut mail = Email::new("hello", "message body");
//! mail.add_to("you@example.com")?;
//! mailer.send(&mut mail).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Set `TESTING` (or `<PREFIX>_TESTING`) and the mailer resolves to the
//! capture backend no matter what `<PREFIX>_BACKEND` says; sent messages
//! land in an observable outbox instead of the network.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
mod error;
mod mailer;
mod registry;
mod transport;

pub use backend::{BackendFactory, BackendRegistry, DummyTransport, SmtpTransport};
pub use config::{
    BackendOptions, DEFAULT_PREFIX, DUMMY_BACKEND, MailerOptions, SMTP_BACKEND, Settings, Value,
    config_key,
};
pub use error::{Error, Result};
pub use mailer::Mailer;
pub use registry::MailerRegistry;
pub use transport::Transport;

// The message types are the crate's public vocabulary; re-export them so
// callers need only one dependency.
pub use mailpost_message::{Address, AddressInput, AddressList, Email, HeaderValue, MailMessage};

/// Builds a single-recipient message and sends it through `mailer`.
///
/// With `fail_quiet` set, delivery failures are absorbed; validation and
/// configuration errors always propagate.
///
/// # Errors
///
/// Returns an error if the recipient fails sanitization or the send fails
/// (subject to `fail_quiet`).
pub async fn send_email(
    mailer: &Mailer,
    subject: impl Into<HeaderValue>,
    text: impl Into<String>,
    to: impl Into<AddressInput>,
    fail_quiet: bool,
) -> Result<()> {
    let mut mail = Email::new(subject, text);
    mail.add_to(to)?;

    if fail_quiet {
        mailer.send_quiet(&mut mail).await
    } else {
        mailer.send(&mut mail).await
    }
}
