//! Header text encoding utilities.
//!
//! Supports RFC 2047 encoded-words for non-ASCII header text and IDNA
//! (ASCII-Compatible Encoding) for internationalized domain names.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Charsets accepted for encoded-word output.
///
/// Header text is held as Rust strings, so anything beyond UTF-8 and its
/// ASCII subset cannot be produced without transcoding.
const SUPPORTED_CHARSETS: &[&str] = &["utf-8", "utf8", "us-ascii", "ascii"];

/// Returns true when `text` can travel in a header without encoding.
#[must_use]
pub fn is_header_safe(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii() && c != '=' && c != '?')
}

/// Encodes a header value using RFC 2047 encoded-word syntax.
///
/// Format: `=?charset?b?base64-text?=`. ASCII-only text is returned
/// unchanged.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCharset`] if `charset` is not a supported
/// character encoding.
pub fn encode_rfc2047(text: &str, charset: &str) -> Result<String> {
    if is_header_safe(text) {
        return Ok(text.to_string());
    }

    if !SUPPORTED_CHARSETS.contains(&charset.to_ascii_lowercase().as_str()) {
        return Err(Error::UnsupportedCharset(charset.to_string()));
    }

    let encoded = STANDARD.encode(text.as_bytes());
    Ok(format!("=?{charset}?b?{encoded}?="))
}

/// Encodes a header value, retrying once with utf-8 when the named charset
/// is not supported.
///
/// # Errors
///
/// Returns an error only if the utf-8 fallback itself fails.
pub fn encode_rfc2047_or_utf8(text: &str, charset: &str) -> Result<String> {
    match encode_rfc2047(text, charset) {
        Err(Error::UnsupportedCharset(_)) => encode_rfc2047(text, "utf-8"),
        other => other,
    }
}

/// Converts a domain name to its ASCII-Compatible Encoding.
///
/// ASCII domains pass through unchanged.
///
/// # Errors
///
/// Returns [`Error::InvalidDomain`] if IDNA conversion fails.
pub fn encode_domain(domain: &str) -> Result<String> {
    if domain.is_ascii() {
        return Ok(domain.to_string());
    }

    idna::domain_to_ascii(domain).map_err(|e| Error::InvalidDomain(format!("{domain}: {e}")))
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
    fn ascii_text_passes_through() {
        assert_eq!(encode_rfc2047("Hello", "utf-8").unwrap(), "Hello");
    }

    #[test]
    fn non_ascii_text_is_encoded() {
        let encoded = encode_rfc2047("Héllo", "utf-8").unwrap();
        assert!(encoded.starts_with("=?utf-8?b?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn cyrillic_subject_encodes_to_known_form() {
        let encoded = encode_rfc2047("Привет", "utf-8").unwrap();
        assert_eq!(encoded, "=?utf-8?b?0J/RgNC40LLQtdGC?=");
    }

    #[test]
    fn equals_and_question_marks_trigger_encoding() {
        // Bare '=' or '?' could be mistaken for encoded-word syntax.
        assert!(encode_rfc2047("=?fake?=", "utf-8").unwrap().starts_with("=?utf-8?b?"));
    }

    #[test]
    fn unknown_charset_is_rejected() {
        let err = encode_rfc2047("Héllo", "koi8-r").unwrap_err();
        assert!(matches!(err, Error::UnsupportedCharset(_)));
    }

    #[test]
    fn unknown_charset_falls_back_to_utf8() {
        let encoded = encode_rfc2047_or_utf8("Héllo", "koi8-r").unwrap();
        assert!(encoded.starts_with("=?utf-8?b?"));
    }

    #[test]
    fn ascii_domain_passes_through() {
        assert_eq!(encode_domain("example.com").unwrap(), "example.com");
    }

    #[test]
    fn unicode_domain_is_punycoded() {
        assert_eq!(encode_domain("bücher.de").unwrap(), "xn--bcher-kva.de");
    }
}
