//! Error taxonomy for the mailer.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by mailer configuration, construction and delivery.
#[derive(Debug, Error)]
pub enum Error {
    /// No backend is registered under the configured identifier.
    #[error("unknown mail backend: '{0}'")]
    UnknownBackend(String),

    /// A mailer is already registered for this prefix.
    #[error("mailer already registered for prefix '{0}'")]
    DuplicateMailer(String),

    /// No mailer is registered for this prefix.
    #[error("no mailer registered for prefix '{0}'")]
    MissingMailer(String),

    /// A configuration option has the wrong shape.
    #[error("configuration error: {0}")]
    Config(String),

    /// Username and password must be configured together.
    #[error("invalid credentials, please setup both username and password or neither")]
    Credentials,

    /// Message construction or serialization failed.
    #[error(transparent)]
    Message(#[from] mailpost_message::Error),

    /// Network or session failure during delivery.
    #[error("delivery failed: {0}")]
    Delivery(#[from] mailpost_smtp::Error),
}

impl Error {
    /// True for delivery-class failures, the only class `send_quiet`
    /// absorbs.
    #[must_use]
    pub const fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery(_))
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
    fn only_delivery_errors_are_absorbable() {
        let delivery = Error::Delivery(mailpost_smtp::Error::Protocol("boom".into()));
        assert!(delivery.is_delivery());

        assert!(!Error::Credentials.is_delivery());
        assert!(!Error::Message(mailpost_message::Error::Incomplete).is_delivery());
        assert!(!Error::UnknownBackend("smtp".into()).is_delivery());
    }

    #[test]
    fn credentials_message_matches_contract() {
        assert_eq!(
            Error::Credentials.to_string(),
            "invalid credentials, please setup both username and password or neither"
        );
    }

    #[test]
    fn validation_message_matches_contract() {
        let err = Error::Message(mailpost_message::Error::Incomplete);
        assert_eq!(err.to_string(), "fill in mailing parameters first");
    }
}
