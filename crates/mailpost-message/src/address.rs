//! Email address sanitization and rendering.
//!
//! Every address is sanitized at construction time: line-break characters
//! are stripped from all parts so a crafted value can never smuggle extra
//! headers into a serialized message. Rendering applies RFC 2047
//! encoded-words to non-ASCII display names and local parts, and IDNA to
//! non-ASCII domains.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::encoding::{encode_domain, encode_rfc2047_or_utf8, is_header_safe};
use crate::error::{Error, Result};

/// Default charset for encoded-word output.
const DEFAULT_CHARSET: &str = "utf-8";

/// Characters that force a display name into a quoted-string.
const NAME_SPECIALS: &[char] = &['"', ',', ';', ':', '<', '>', '@', '(', ')', '\\'];

/// Raw address input accepted by constructors and setters.
///
/// Replaces implicit runtime coercion with an explicit sum type: a bare
/// address string (optionally in `Name <addr>` form), a display-name/address
/// pair, or an already-sanitized [`Address`].
#[derive(Debug, Clone)]
pub enum AddressInput {
    /// A bare address string, e.g. `"alice@example.com"` or
    /// `"Alice <alice@example.com>"`.
    Bare(String),
    /// A (display name, address) pair.
    Named {
        /// Display name shown before the angle-bracketed address.
        name: String,
        /// The address itself.
        address: String,
    },
    /// An address that has already been sanitized.
    Parsed(Address),
}

impl From<&str> for AddressInput {
    fn from(raw: &str) -> Self {
        Self::Bare(raw.to_string())
    }
}

impl From<String> for AddressInput {
    fn from(raw: String) -> Self {
        Self::Bare(raw)
    }
}

impl From<(&str, &str)> for AddressInput {
    fn from((name, address): (&str, &str)) -> Self {
        Self::Named {
            name: name.to_string(),
            address: address.to_string(),
        }
    }
}

impl From<(String, String)> for AddressInput {
    fn from((name, address): (String, String)) -> Self {
        Self::Named { name, address }
    }
}

impl From<Address> for AddressInput {
    fn from(address: Address) -> Self {
        Self::Parsed(address)
    }
}

impl From<&Address> for AddressInput {
    fn from(address: &Address) -> Self {
        Self::Parsed(address.clone())
    }
}

/// A single mail endpoint, optionally with a display name.
///
/// Construction sanitizes the raw input and eagerly computes the rendered
/// header form, so invalid input is rejected at assignment time. Equality
/// and hashing are defined on the rendered sanitized string: two addresses
/// compare equal exactly when they produce the same header text.
#[derive(Debug, Clone)]
pub struct Address {
    name: Option<String>,
    address: String,
    rendered: String,
}

impl Address {
    /// Creates an address from any raw input form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address part is empty after
    /// sanitization, or [`Error::InvalidDomain`] if an internationalized
    /// domain cannot be converted to its ASCII form.
    pub fn new(input: impl Into<AddressInput>) -> Result<Self> {
        Self::with_charset(input, DEFAULT_CHARSET)
    }

    /// Creates an address, encoding non-ASCII parts at the given charset.
    ///
    /// An unsupported charset falls back to utf-8.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Address::new`].
    pub fn with_charset(input: impl Into<AddressInput>, charset: &str) -> Result<Self> {
        match input.into() {
            AddressInput::Bare(raw) => {
                let raw = strip_line_breaks(&raw);
                let (name, address) = split_name_address(&raw);
                Self::build(name, address, charset)
            }
            AddressInput::Named { name, address } => Self::build(
                Some(strip_line_breaks(&name)),
                strip_line_breaks(&address),
                charset,
            ),
            AddressInput::Parsed(address) => Ok(address),
        }
    }

    fn build(name: Option<String>, address: String, charset: &str) -> Result<Self> {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if address.is_empty() {
            return Err(Error::InvalidAddress("empty address".to_string()));
        }

        let address = encode_addr_spec(&address)?;
        let rendered = match &name {
            Some(name) => {
                let name = if is_encoded_word(name) {
                    // Re-sanitizing an already-rendered address must be
                    // stable, so an encoded-word passes through untouched.
                    name.clone()
                } else if is_header_safe(name) {
                    maybe_quote(name)
                } else {
                    encode_rfc2047_or_utf8(name, charset)?
                };
                let local_rendered = render_local_part(&address, charset)?;
                format!("{name} <{local_rendered}>")
            }
            None => render_local_part(&address, charset)?,
        };

        Ok(Self {
            name,
            address,
            rendered,
        })
    }

    /// The display name, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The bare `local@domain` address with an ASCII-encoded domain,
    /// suitable for an SMTP envelope.
    #[must_use]
    pub fn addr_spec(&self) -> &str {
        &self.address
    }

    /// The sanitized, encoded header form of this address.
    #[must_use]
    pub fn render(&self) -> &str {
        &self.rendered
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.rendered == other.rendered
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rendered.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Removes CR and LF characters.
fn strip_line_breaks(s: &str) -> String {
    s.chars().filter(|&c| c != '\r' && c != '\n').collect()
}

/// Splits a bare string into optional display name and address.
///
/// Understands the `Name <addr>` grammar; anything else is treated as a
/// bare address.
fn split_name_address(raw: &str) -> (Option<String>, String) {
    let raw = raw.trim();
    if let Some(open) = raw.rfind('<')
        && raw.ends_with('>')
    {
        let name = raw[..open].trim().trim_matches('"').trim();
        let address = raw[open + 1..raw.len() - 1].trim();
        let name = if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        };
        return (name, address.to_string());
    }
    (None, raw.to_string())
}

/// Encodes the domain of `local@domain` with IDNA, leaving the local part
/// untouched.
fn encode_addr_spec(address: &str) -> Result<String> {
    match address.rsplit_once('@') {
        Some((local, domain)) => {
            let domain = encode_domain(domain)?;
            Ok(format!("{local}@{domain}"))
        }
        None => Ok(address.to_string()),
    }
}

/// Renders `local@domain` for a header, encoding a non-ASCII local part
/// with RFC 2047. The domain is already ASCII at this point.
fn render_local_part(address: &str, charset: &str) -> Result<String> {
    match address.rsplit_once('@') {
        Some((local, domain)) if !local.is_ascii() => {
            let local = encode_rfc2047_or_utf8(local, charset)?;
            Ok(format!("{local}@{domain}"))
        }
        _ => Ok(address.to_string()),
    }
}

/// True when `name` is already an RFC 2047 encoded-word.
fn is_encoded_word(name: &str) -> bool {
    name.starts_with("=?") && name.ends_with("?=") && name.is_ascii()
}

/// Wraps a display name in a quoted-string when it contains specials.
fn maybe_quote(name: &str) -> String {
    if name.chars().any(|c| NAME_SPECIALS.contains(&c)) {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        name.to_string()
    }
}

/// An ordered list of sanitized addresses.
///
/// Append does not deduplicate; rendering joins entries with `", "`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressList {
    items: Vec<Address>,
}

impl AddressList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends one address, coercing from any raw input form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input fails sanitization.
    pub fn push(&mut self, input: impl Into<AddressInput>) -> Result<()> {
        self.items.push(Address::new(input)?);
        Ok(())
    }

    /// Appends every address from an iterable of raw inputs.
    ///
    /// # Errors
    ///
    /// Returns an error on the first input that fails sanitization;
    /// earlier inputs stay appended.
    pub fn extend<I, T>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<AddressInput>,
    {
        for input in inputs {
            self.push(input)?;
        }
        Ok(())
    }

    /// Builds a list from an iterable of raw inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if any input fails sanitization.
    pub fn from_inputs<I, T>(inputs: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<AddressInput>,
    {
        let mut list = Self::new();
        list.extend(inputs)?;
        Ok(list)
    }

    /// Renders the list as a comma-joined header value.
    #[must_use]
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(Address::render)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the list already holds an address with the same rendered
    /// form.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.items.contains(address)
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Address> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a AddressList {
    type Item = &'a Address;
    type IntoIter = std::slice::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Address> for AddressList {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
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
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn bare_address_renders_unchanged() {
        let addr = Address::new("alice@example.com").unwrap();
        assert_eq!(addr.render(), "alice@example.com");
        assert!(addr.name().is_none());
    }

    #[test]
    fn named_pair_renders_with_angle_brackets() {
        let addr = Address::new(("Alice", "alice@x.com")).unwrap();
        assert_eq!(addr.render(), "Alice <alice@x.com>");
        assert_eq!(addr.addr_spec(), "alice@x.com");
    }

    #[test]
    fn bare_string_with_display_name_is_parsed() {
        let addr = Address::new("Alice <alice@x.com>").unwrap();
        assert_eq!(addr.name(), Some("Alice"));
        assert_eq!(addr.addr_spec(), "alice@x.com");
        assert_eq!(addr.render(), "Alice <alice@x.com>");
    }

    #[test]
    fn sanitize_is_idempotent_on_rendered_form() {
        let first = Address::new(("Alice from Wonderland", "alice@wonderland.com")).unwrap();
        let second = Address::new(first.render()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.render(), second.render());
    }

    #[test]
    fn sanitize_is_idempotent_for_encoded_names() {
        let first = Address::new(("Алиса", "alice@x.com")).unwrap();
        let second = Address::new(first.render()).unwrap();
        assert_eq!(first.render(), second.render());
    }

    #[test]
    fn line_breaks_are_stripped() {
        let addr = Address::new(("Mad\r\nHatter", "hatter@x.com\r\nBcc: spy@evil.com")).unwrap();
        assert!(!addr.render().contains('\r'));
        assert!(!addr.render().contains('\n'));
        assert_eq!(addr.name(), Some("MadHatter"));
    }

    #[test]
    fn non_ascii_name_is_rfc2047_encoded() {
        let addr = Address::new(("Алиса", "alice@x.com")).unwrap();
        assert!(addr.render().starts_with("=?utf-8?b?"));
        assert!(addr.render().ends_with("<alice@x.com>"));
    }

    #[test]
    fn non_ascii_domain_is_idna_encoded() {
        let addr = Address::new("post@bücher.de").unwrap();
        assert_eq!(addr.addr_spec(), "post@xn--bcher-kva.de");
        assert_eq!(addr.render(), "post@xn--bcher-kva.de");
    }

    #[test]
    fn non_ascii_local_part_is_rfc2047_encoded_in_header() {
        let addr = Address::new("jürgen@example.com").unwrap();
        assert_eq!(addr.addr_spec(), "jürgen@example.com");
        assert!(addr.render().starts_with("=?utf-8?b?"));
        assert!(addr.render().ends_with("@example.com"));
    }

    #[test]
    fn name_with_specials_is_quoted() {
        let addr = Address::new(("Liddell, Alice", "alice@x.com")).unwrap();
        assert_eq!(addr.render(), "\"Liddell, Alice\" <alice@x.com>");
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!(Address::new("").is_err());
        assert!(Address::new(("Alice", "")).is_err());
    }

    #[test]
    fn equality_is_on_rendered_form() {
        let from_pair = Address::new(("Alice", "alice@x.com")).unwrap();
        let from_string = Address::new("Alice <alice@x.com>").unwrap();
        assert_eq!(from_pair, from_string);

        let bare = Address::new("alice@x.com").unwrap();
        assert_ne!(from_pair, bare);
    }

    #[test]
    fn list_append_keeps_duplicates() {
        let mut list = AddressList::new();
        list.push("a@x.com").unwrap();
        list.push("a@x.com").unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn list_renders_comma_joined() {
        let mut list = AddressList::new();
        list.push("one@example.com").unwrap();
        list.push(("Two", "two@example.com")).unwrap();
        assert_eq!(list.render(), "one@example.com, Two <two@example.com>");
    }

    #[test]
    fn list_from_inputs() {
        let list = AddressList::from_inputs(["a@x.com", "b@x.com"]).unwrap();
        assert_eq!(list.len(), 2);
        assert!(!list.is_empty());
    }

    proptest! {
        #[test]
        fn rendered_form_never_contains_line_breaks(
            name in "[a-zA-Zа-яё\r\n ]{0,24}",
            local in "[a-z0-9.\r\n]{1,16}",
        ) {
            let address = format!("{local}@example.com");
            if let Ok(addr) = Address::new((name.as_str(), address.as_str())) {
                prop_assert!(!addr.render().contains('\r'));
                prop_assert!(!addr.render().contains('\n'));
            }
        }

        #[test]
        fn sanitize_rendered_is_stable(
            name in "[a-zA-Z ]{0,16}",
            local in "[a-z0-9.]{1,12}",
        ) {
            let address = format!("{local}@example.com");
            if let Ok(first) = Address::new((name.as_str(), address.as_str())) {
                let second = Address::new(first.render()).unwrap();
                prop_assert_eq!(first.render(), second.render());
            }
        }
    }
}
