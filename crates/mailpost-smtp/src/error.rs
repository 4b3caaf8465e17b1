//! Error types for SMTP sessions.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP session error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server rejected a command.
    #[error("SMTP error {code}: {message}")]
    Rejected {
        /// Reply code (e.g. 550).
        code: u16,
        /// Error message from the server.
        message: String,
    },

    /// Protocol error (malformed or unexpected response).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid envelope address.
    #[error("invalid envelope address: {0}")]
    InvalidAddress(String),

    /// Feature not offered by the server.
    #[error("server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates a rejection error from a reply code and message.
    #[must_use]
    pub fn rejected(code: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }

    /// True for permanent failures (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 500 && *code < 600)
    }

    /// True for transient failures (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 400 && *code < 500)
    }
}
