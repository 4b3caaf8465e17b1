//! # mailpost-message
//!
//! Mail message construction library for the mailpost mailer.
//!
//! ## Features
//!
//! - **Address sanitization**: Line breaks are stripped from every address
//!   part before it can reach a header (header-injection defense)
//! - **Internationalization**: RFC 2047 encoded-words for non-ASCII header
//!   text, IDNA (ASCII-Compatible Encoding) for non-ASCII domains
//! - **Recipient handling**: Ordered To/Cc/Bcc lists with a deduplicated
//!   envelope-recipient set
//! - **Serialization**: Transport-ready plain-text messages; `Bcc` never
//!   appears in serialized headers
//!
//! ## Quick Start
//!
//! ```
//! use mailpost_message::Email;
//!
//! # fn main() -> mailpost_message::Result<()> {
//! let mut mail = Email::new("Down the Rabbit-Hole", "What is the use of a book?");
//! mail.set_from(("Alice", "alice@wonderland.com"))?;
//! mail.add_to("hatter@wonderland.com")?;
//! mail.add_cc("march.hare@wonderland.com")?;
//!
//! let message = mail.to_message()?;
//! assert_eq!(message.get("From"), Some("Alice <alice@wonderland.com>"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod error;
mod header;
mod message;

pub mod encoding;

pub use address::{Address, AddressInput, AddressList};
pub use error::{Error, Result};
pub use header::HeaderValue;
pub use message::{Email, MailMessage};

/// Line separator used for serialized messages, per mail-transport convention.
pub const CRLF: &str = "\r\n";
