//! # mailpost-smtp
//!
//! SMTP client sessions for the mailpost mailer, implementing the client
//! side of RFC 5321.
//!
//! ## Features
//!
//! - **Type-state sessions**: compile-time enforcement of valid SMTP state
//!   transitions (MAIL FROM before RCPT TO before DATA)
//! - **Protocol support**: EHLO, AUTH PLAIN, STARTTLS, MAIL, RCPT, DATA
//! - **TLS**: STARTTLS upgrade over rustls
//! - **One session per send**: no pooling, no state shared between sends
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpost_smtp::{EnvelopeAddress, Session, connect};
//!
//! let stream = connect("smtp.example.com", 587).await?;
//! let mut session = Session::open(stream).await?.ehlo("localhost").await?;
//! session.auth_plain("user@example.com", "password").await?;
//!
//! let from = EnvelopeAddress::new("sender@example.com")?;
//! let to = EnvelopeAddress::new("recipient@example.com")?;
//!
//! let session = session
//!     .mail_from(&from)
//!     .await?
//!     .rcpt_to(&to)
//!     .await?
//!     .data()
//!     .await?
//!     .send_payload(b"Subject: Test\r\n\r\nHello!\r\n")
//!     .await?;
//!
//! session.quit().await?;
//! ```
//!
//! ## Session states
//!
//! ```text
//! Connected ── mail_from() ──→ Transaction ── rcpt_to() ──→ RecipientAdded
//!     ↑                                                          │
//!     └────────────── send_payload() ←── data() ←────────────────┘
//! ```
//!
//! `auth_plain` and `starttls` run in the `Connected` state; `quit` (or a
//! plain drop, the forced close) ends the session from any state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Connected, DataMode, RecipientAdded, ServerCapabilities, Session, SmtpStream, Transaction,
    connect,
};
pub use error::{Error, Result};
pub use types::{AuthMechanism, EnvelopeAddress, Extension, Reply, ReplyCode};
