//! SMTP session management.
//!
//! [`Session`] uses the type-state pattern so an out-of-order transaction
//! (RCPT before MAIL, DATA without recipients) cannot compile.

mod session;
mod stream;

pub use session::{Connected, DataMode, RecipientAdded, Session, Transaction};
pub use stream::{SmtpStream, connect};

use std::collections::HashSet;

use crate::types::Extension;

/// Server capabilities discovered from the greeting and EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerCapabilities {
    /// Server hostname from the greeting.
    pub hostname: String,
    /// Extensions advertised by the last EHLO.
    pub extensions: HashSet<Extension>,
}

impl ServerCapabilities {
    /// True when the server advertises the given extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// True when STARTTLS is available.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Authentication mechanisms advertised by the server.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<crate::types::AuthMechanism> {
        for ext in &self.extensions {
            if let Extension::Auth(mechanisms) = ext {
                return mechanisms.clone();
            }
        }
        Vec::new()
    }
}
