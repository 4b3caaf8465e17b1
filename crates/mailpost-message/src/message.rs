//! Email message aggregation and serialization.

use std::fmt;

use crate::address::{Address, AddressInput, AddressList};
use crate::error::{Error, Result};
use crate::header::HeaderValue;
use crate::CRLF;

/// An email message under construction.
///
/// Address-bearing fields are coerced and validated on assignment, not at
/// serialization time. The message itself stays mutable so callers can keep
/// appending recipients up until the send.
#[derive(Debug, Clone, Default)]
pub struct Email {
    subject: HeaderValue,
    text: String,
    from_addr: Option<Address>,
    to: AddressList,
    cc: AddressList,
    bcc: AddressList,
    reply_to: Option<Address>,
}

impl Email {
    /// Creates a message with a subject and plain-text body.
    pub fn new(subject: impl Into<HeaderValue>, text: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// The subject header value.
    #[must_use]
    pub const fn subject(&self) -> &HeaderValue {
        &self.subject
    }

    /// Replaces the subject.
    pub fn set_subject(&mut self, subject: impl Into<HeaderValue>) {
        self.subject = subject.into();
    }

    /// The plain-text body.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the body text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// The sender address, if set.
    #[must_use]
    pub const fn from_addr(&self) -> Option<&Address> {
        self.from_addr.as_ref()
    }

    /// Sets the sender address.
    ///
    /// # Errors
    ///
    /// Returns an error if the input fails sanitization.
    pub fn set_from(&mut self, input: impl Into<AddressInput>) -> Result<()> {
        self.from_addr = Some(Address::new(input)?);
        Ok(())
    }

    /// The `To` recipient list.
    #[must_use]
    pub const fn to(&self) -> &AddressList {
        &self.to
    }

    /// Appends one `To` recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the input fails sanitization.
    pub fn add_to(&mut self, input: impl Into<AddressInput>) -> Result<()> {
        self.to.push(input)
    }

    /// Replaces the `To` list from an iterable of raw inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if any input fails sanitization.
    pub fn set_to<I, T>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<AddressInput>,
    {
        self.to = AddressList::from_inputs(inputs)?;
        Ok(())
    }

    /// The `Cc` recipient list.
    #[must_use]
    pub const fn cc(&self) -> &AddressList {
        &self.cc
    }

    /// Appends one `Cc` recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the input fails sanitization.
    pub fn add_cc(&mut self, input: impl Into<AddressInput>) -> Result<()> {
        self.cc.push(input)
    }

    /// Replaces the `Cc` list from an iterable of raw inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if any input fails sanitization.
    pub fn set_cc<I, T>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<AddressInput>,
    {
        self.cc = AddressList::from_inputs(inputs)?;
        Ok(())
    }

    /// The `Bcc` recipient list.
    #[must_use]
    pub const fn bcc(&self) -> &AddressList {
        &self.bcc
    }

    /// Appends one `Bcc` recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the input fails sanitization.
    pub fn add_bcc(&mut self, input: impl Into<AddressInput>) -> Result<()> {
        self.bcc.push(input)
    }

    /// Replaces the `Bcc` list from an iterable of raw inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if any input fails sanitization.
    pub fn set_bcc<I, T>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<AddressInput>,
    {
        self.bcc = AddressList::from_inputs(inputs)?;
        Ok(())
    }

    /// The `Reply-To` address, if set.
    #[must_use]
    pub const fn reply_to(&self) -> Option<&Address> {
        self.reply_to.as_ref()
    }

    /// Sets the `Reply-To` address.
    ///
    /// # Errors
    ///
    /// Returns an error if the input fails sanitization.
    pub fn set_reply_to(&mut self, input: impl Into<AddressInput>) -> Result<()> {
        self.reply_to = Some(Address::new(input)?);
        Ok(())
    }

    /// The deduplicated union of To, Cc and Bcc — the envelope recipients.
    ///
    /// Duplicates collapse by rendered sanitized form; the first occurrence
    /// wins and insertion order is retained.
    #[must_use]
    pub fn recipients(&self) -> AddressList {
        let mut unique = AddressList::new();
        for address in self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter()) {
            if !unique.contains(address) {
                // push of an already-sanitized Address cannot fail
                let _ = unique.push(address);
            }
        }
        unique
    }

    /// Serializes into a transport-ready message.
    ///
    /// `Bcc` recipients are deliberately absent from the headers; they only
    /// participate in [`Email::recipients`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Incomplete`] when body, subject, `To` or the sender
    /// address is empty/absent.
    pub fn to_message(&self) -> Result<MailMessage> {
        let from_addr = match &self.from_addr {
            Some(from_addr) if !self.text.is_empty() && !self.subject.is_empty() => from_addr,
            _ => return Err(Error::Incomplete),
        };
        if self.to.is_empty() {
            return Err(Error::Incomplete);
        }

        let mut headers = vec![
            ("MIME-Version".to_string(), "1.0".to_string()),
            ("From".to_string(), from_addr.render().to_string()),
            ("To".to_string(), self.to.render()),
            ("Subject".to_string(), self.subject.render()?),
            (
                "Content-Type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            ),
            (
                "Content-Transfer-Encoding".to_string(),
                "8bit".to_string(),
            ),
        ];

        if !self.cc.is_empty() {
            headers.push(("Cc".to_string(), self.cc.render()));
        }

        if let Some(reply_to) = &self.reply_to {
            headers.push(("Reply-To".to_string(), reply_to.render().to_string()));
        }

        Ok(MailMessage {
            headers,
            body: self.text.clone(),
        })
    }

    /// Serializes and joins all message lines with the given separator.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Email::to_message`].
    pub fn format(&self, sep: &str) -> Result<String> {
        Ok(self.to_message()?.format(sep))
    }
}

/// A serialized, transport-ready message: ordered headers plus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    headers: Vec<(String, String)>,
    body: String,
}

impl MailMessage {
    /// The headers in serialization order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The first value of the named header, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The message body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Joins header and body lines with the given separator.
    #[must_use]
    pub fn format(&self, sep: &str) -> String {
        let mut lines: Vec<String> = self
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        lines.push(String::new());
        lines.extend(
            self.body
                .split('\n')
                .map(|line| line.trim_end_matches('\r').to_string()),
        );
        lines.join(sep)
    }

    /// The CRLF wire form handed to a transport.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.format(CRLF).into_bytes()
    }
}

impl fmt::Display for MailMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format("\n"))
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

    fn wonderland_mail() -> Email {
        let mut mail = Email::new(
            "Down the Rabbit-Hole",
            "What is the use of a book without pictures or conversation?",
        );
        mail.set_from(("Alice from Wonderland", "alice@wonderland.com"))
            .unwrap();
        mail.set_to(["one@example.com", "two@example.com"]).unwrap();
        mail.add_cc("cc@example.com").unwrap();
        mail.add_bcc("bcc@example.com").unwrap();
        mail.set_reply_to("noreply@wonderland.com").unwrap();
        mail
    }

    #[test]
    fn fields_round_trip() {
        let mail = wonderland_mail();
        assert_eq!(mail.subject().as_str(), "Down the Rabbit-Hole");
        assert_eq!(
            mail.from_addr().unwrap().render(),
            "Alice from Wonderland <alice@wonderland.com>"
        );
        assert_eq!(mail.to().len(), 2);
        assert_eq!(mail.cc().len(), 1);
        assert_eq!(mail.bcc().len(), 1);
        assert_eq!(mail.reply_to().unwrap().render(), "noreply@wonderland.com");
    }

    #[test]
    fn recipients_union_all_three_lists() {
        let mut mail = wonderland_mail();
        assert_eq!(mail.recipients().len(), 4);
        mail.add_to("somebody@example.com").unwrap();
        assert_eq!(mail.recipients().len(), 5);
    }

    #[test]
    fn recipients_dedupe_across_lists() {
        let mut mail = Email::new("hi", "body");
        mail.set_from("me@x.com").unwrap();
        mail.set_to(["a@x.com", "b@x.com"]).unwrap();
        mail.add_cc("b@x.com").unwrap();
        assert_eq!(mail.recipients().len(), 2);
    }

    #[test]
    fn appending_duplicate_does_not_grow_recipients() {
        let mut mail = wonderland_mail();
        let before = mail.recipients().len();
        mail.add_to("cc@example.com").unwrap();
        assert_eq!(mail.recipients().len(), before);
    }

    #[test]
    fn from_pair_renders_name_and_address() {
        let mut mail = Email::new("hello", "body");
        mail.set_from(("Alice", "alice@x.com")).unwrap();
        assert_eq!(mail.from_addr().unwrap().render(), "Alice <alice@x.com>");
    }

    #[test]
    fn serialized_headers_match_contract() {
        let message = wonderland_mail().to_message().unwrap();
        assert_eq!(
            message.get("From"),
            Some("Alice from Wonderland <alice@wonderland.com>")
        );
        assert_eq!(message.get("To"), Some("one@example.com, two@example.com"));
        assert_eq!(message.get("Subject"), Some("Down the Rabbit-Hole"));
        assert_eq!(message.get("Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(message.get("Content-Transfer-Encoding"), Some("8bit"));
        assert_eq!(message.get("Cc"), Some("cc@example.com"));
        assert_eq!(message.get("Reply-To"), Some("noreply@wonderland.com"));
    }

    #[test]
    fn bcc_never_appears_in_serialized_output() {
        let mail = wonderland_mail();
        let message = mail.to_message().unwrap();
        assert_eq!(message.get("Bcc"), None);

        let formatted = mail.format(CRLF).unwrap();
        assert!(!formatted.contains("Bcc:"));
        assert!(!formatted.contains("bcc@example.com"));
    }

    #[test]
    fn to_header_lists_only_to_recipients() {
        let message = wonderland_mail().to_message().unwrap();
        let to = message.get("To").unwrap();
        assert!(!to.contains("cc@example.com"));
        assert!(!to.contains("bcc@example.com"));
    }

    #[test]
    fn serialization_requires_all_mailing_parameters() {
        let complete = wonderland_mail();
        assert!(complete.to_message().is_ok());

        let mut no_text = complete.clone();
        no_text.set_text("");
        assert!(matches!(no_text.to_message(), Err(Error::Incomplete)));

        let mut no_subject = complete.clone();
        no_subject.set_subject("");
        assert!(matches!(no_subject.to_message(), Err(Error::Incomplete)));

        let mut no_to = complete.clone();
        no_to.set_to(Vec::<&str>::new()).unwrap();
        assert!(matches!(no_to.to_message(), Err(Error::Incomplete)));

        let no_from = Email::new("hi", "body");
        assert!(matches!(no_from.to_message(), Err(Error::Incomplete)));
    }

    #[test]
    fn format_joins_with_separator() {
        let mut mail = Email::new("hello", "line one\nline two");
        mail.set_from("me@x.com").unwrap();
        mail.add_to("you@x.com").unwrap();

        let formatted = mail.format("\n").unwrap();
        assert_eq!(
            formatted,
            "MIME-Version: 1.0\n\
             From: me@x.com\n\
             To: you@x.com\n\
             Subject: hello\n\
             Content-Type: text/plain; charset=utf-8\n\
             Content-Transfer-Encoding: 8bit\n\
             \n\
             line one\n\
             line two"
        );
    }

    #[test]
    fn wire_form_uses_crlf() {
        let mut mail = Email::new("hello", "body");
        mail.set_from("me@x.com").unwrap();
        mail.add_to("you@x.com").unwrap();

        let bytes = mail.to_message().unwrap().to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Subject: hello\r\n"));
        assert!(text.ends_with("\r\nbody"));
    }

    #[test]
    fn non_ascii_subject_is_encoded_in_headers() {
        let mut mail = Email::new("Привет", "body");
        mail.set_from("me@x.com").unwrap();
        mail.add_to("you@x.com").unwrap();

        let message = mail.to_message().unwrap();
        let subject = message.get("Subject").unwrap();
        assert!(subject.starts_with("=?utf-8?b?"));
    }
}
