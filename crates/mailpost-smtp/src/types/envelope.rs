//! Envelope address type.

use crate::error::{Error, Result};

/// An address used in MAIL FROM and RCPT TO.
///
/// This is the transport-level recipient identity, distinct from the
/// header-visible display form a message carries. Local-only addresses
/// (`postmaster`, `webmaster`) are valid here; display names are not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvelopeAddress(String);

impl EnvelopeAddress {
    /// Creates an envelope address after basic validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is empty, contains
    /// whitespace or angle brackets, or has an empty local or domain part
    /// around an `@`.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// The address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("address is empty".into()));
        }
        if addr
            .chars()
            .any(|c| c.is_whitespace() || c == '\r' || c == '\n' || c == '<' || c == '>')
        {
            return Err(Error::InvalidAddress(format!(
                "address contains forbidden characters: {addr}"
            )));
        }
        if let Some((local, domain)) = addr.rsplit_once('@')
            && (local.is_empty() || domain.is_empty())
        {
            return Err(Error::InvalidAddress(format!(
                "empty local or domain part in {addr}"
            )));
        }

        Ok(())
    }
}

impl std::fmt::Display for EnvelopeAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
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
    fn valid_address() {
        let addr = EnvelopeAddress::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
    }

    #[test]
    fn local_only_address_is_allowed() {
        assert!(EnvelopeAddress::new("webmaster").is_ok());
    }

    #[test]
    fn empty_parts_are_rejected() {
        assert!(EnvelopeAddress::new("").is_err());
        assert!(EnvelopeAddress::new("@example.com").is_err());
        assert!(EnvelopeAddress::new("user@").is_err());
    }

    #[test]
    fn injection_characters_are_rejected() {
        assert!(EnvelopeAddress::new("user@example.com\r\n").is_err());
        assert!(EnvelopeAddress::new("<user@example.com>").is_err());
        assert!(EnvelopeAddress::new("user name@example.com").is_err());
    }
}
