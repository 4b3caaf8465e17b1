//! Free-text header values.

use std::fmt;

use crate::encoding::encode_rfc2047_or_utf8;
use crate::error::Result;

/// A free-text header value (subject line and friends) with a charset tag.
///
/// Rendering collapses line breaks into single spaces, so a crafted value
/// cannot inject additional headers, and applies RFC 2047 encoding when the
/// text is not ASCII. A value is "empty" exactly when the underlying raw
/// text is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderValue {
    value: String,
    charset: String,
}

impl HeaderValue {
    /// Creates a header value with the default utf-8 charset.
    pub fn new(value: impl Into<String>) -> Self {
        Self::with_charset(value, "utf-8")
    }

    /// Creates a header value with an explicit charset tag.
    ///
    /// An unsupported charset falls back to utf-8 at render time.
    pub fn with_charset(value: impl Into<String>, charset: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            charset: charset.into(),
        }
    }

    /// The raw, unencoded text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// True when the underlying text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Returns the injection-safe, RFC 2047-encoded header text.
    ///
    /// # Errors
    ///
    /// Returns an error if even the utf-8 fallback encoding fails.
    pub fn render(&self) -> Result<String> {
        let flat = self
            .value
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .split('\n')
            .collect::<Vec<_>>()
            .join(" ");
        encode_rfc2047_or_utf8(&flat, &self.charset)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => f.write_str(&self.value),
        }
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
    fn ascii_subject_renders_unchanged() {
        let subject = HeaderValue::new("plain subject");
        assert_eq!(subject.render().unwrap(), "plain subject");
    }

    #[test]
    fn non_ascii_subject_renders_as_encoded_word() {
        let subject = HeaderValue::new("Привет");
        let rendered = subject.render().unwrap();
        assert!(rendered.starts_with("=?utf-8?b?"));
        assert!(rendered.ends_with("?="));
    }

    #[test]
    fn line_breaks_collapse_to_spaces() {
        let subject = HeaderValue::new("one\r\ntwo\nthree\rfour");
        assert_eq!(subject.render().unwrap(), "one two three four");
    }

    #[test]
    fn unsupported_charset_falls_back_to_utf8() {
        let subject = HeaderValue::with_charset("Привет", "koi8-r");
        assert!(subject.render().unwrap().starts_with("=?utf-8?b?"));
    }

    #[test]
    fn emptiness_tracks_raw_value() {
        assert!(HeaderValue::new("").is_empty());
        assert!(!HeaderValue::new("x").is_empty());
    }
}
