//! Type-state SMTP session.

use std::collections::HashSet;
use std::marker::PhantomData;

use base64::Engine;
use tracing::debug;

use super::{ServerCapabilities, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{AuthMechanism, EnvelopeAddress, Extension, Reply, ReplyCode};

/// Type-state marker: connected, outside a mail transaction.
///
/// Authentication and TLS negotiation happen in this state; both leave the
/// session here, so a transaction can start whether or not they ran.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: MAIL FROM accepted, no recipients yet.
#[derive(Debug)]
pub struct Transaction;

/// Type-state marker: at least one recipient accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker: DATA accepted, message content may be sent.
#[derive(Debug)]
pub struct DataMode;

/// An SMTP session whose valid operations are tracked in the type system.
///
/// Dropping a session at any point is the forced close: the connection is
/// torn down without QUIT.
#[derive(Debug)]
pub struct Session<State> {
    stream: SmtpStream,
    capabilities: ServerCapabilities,
    _state: PhantomData<State>,
}

impl Session<Connected> {
    /// Opens a session on a connected stream by reading the greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the server refuses service.
    pub async fn open(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::rejected(
                greeting.code.as_u16(),
                greeting.message_text(),
            ));
        }

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %hostname, "SMTP session opened");

        Ok(Self {
            stream,
            capabilities: ServerCapabilities {
                hostname,
                extensions: HashSet::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the greeting.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;
        if !reply.is_success() {
            return Err(Error::rejected(reply.code.as_u16(), reply.message_text()));
        }

        self.capabilities.extensions = parse_extensions(&reply);
        Ok(self)
    }

    /// Authenticates with the PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials.
    pub async fn auth_plain(&mut self, username: &str, password: &str) -> Result<()> {
        let credentials = format!("\0{username}\0{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());

        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(encoded),
            })
            .await?;
        if !reply.is_success() {
            return Err(Error::rejected(reply.code.as_u16(), reply.message_text()));
        }

        debug!(user = %username, "authenticated");
        Ok(())
    }

    /// Negotiates TLS: EHLO, STARTTLS, stream upgrade, EHLO again.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised or the handshake
    /// fails.
    pub async fn starttls(self, hostname: &str) -> Result<Self> {
        let mut session = self.ehlo(hostname).await?;
        if !session.capabilities.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = session.send_command(Command::StartTls).await?;
        if !reply.is_success() {
            return Err(Error::rejected(reply.code.as_u16(), reply.message_text()));
        }

        session.stream = session.stream.upgrade_to_tls(hostname).await?;
        debug!(server = %hostname, "TLS negotiated");

        // Capabilities may change after the upgrade.
        session.ehlo(hostname).await
    }

    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(mut self, from: &EnvelopeAddress) -> Result<Session<Transaction>> {
        let reply = self
            .send_command(Command::MailFrom { from: from.clone() })
            .await?;
        if !reply.is_success() {
            return Err(Error::rejected(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self.transition())
    }
}

impl Session<Transaction> {
    /// Adds the first envelope recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: &EnvelopeAddress) -> Result<Session<RecipientAdded>> {
        let reply = self.send_command(Command::RcptTo { to: to.clone() }).await?;
        if !reply.is_success() {
            return Err(Error::rejected(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self.transition())
    }
}

impl Session<RecipientAdded> {
    /// Adds another envelope recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: &EnvelopeAddress) -> Result<Self> {
        let reply = self.send_command(Command::RcptTo { to: to.clone() }).await?;
        if !reply.is_success() {
            return Err(Error::rejected(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self)
    }

    /// Begins message content transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command fails.
    pub async fn data(mut self) -> Result<Session<DataMode>> {
        let reply = self.send_command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(Error::rejected(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self.transition())
    }
}

impl Session<DataMode> {
    /// Transmits the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, leading dots are byte-stuffed
    /// and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if transmission fails or the server rejects the
    /// message.
    pub async fn send_payload(mut self, payload: &[u8]) -> Result<Session<Connected>> {
        let mut lines = payload.split(|&b| b == b'\n').peekable();
        while let Some(line) = lines.next() {
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            // A trailing newline would otherwise add a spurious blank line.
            if line.is_empty() && lines.peek().is_none() {
                break;
            }

            if line.first() == Some(&b'.') {
                self.stream.write_all(b".").await?;
            }
            self.stream.write_all(line).await?;
            self.stream.write_all(b"\r\n").await?;
        }
        self.stream.write_all(b".\r\n").await?;

        let reply = read_reply(&mut self.stream).await?;
        if !reply.is_success() {
            return Err(Error::rejected(reply.code.as_u16(), reply.message_text()));
        }
        debug!("message accepted");

        Ok(self.transition())
    }
}

impl<S> Session<S> {
    /// The capabilities recorded from the last EHLO.
    #[must_use]
    pub const fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// Sends QUIT and closes the session cleanly.
    ///
    /// On error the caller should simply drop the session; that is the
    /// forced-close path.
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT exchange fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(Error::rejected(reply.code.as_u16(), reply.message_text()));
        }

        Ok(())
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        self.stream.write_all(&cmd.serialize()).await?;
        read_reply(&mut self.stream).await
    }

    fn transition<T>(self) -> Session<T> {
        Session {
            stream: self.stream,
            capabilities: self.capabilities,
            _state: PhantomData,
        }
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            return Err(Error::Protocol("connection closed by server".into()));
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

fn parse_extensions(reply: &Reply) -> HashSet<Extension> {
    // First line repeats the server greeting; the rest are extensions.
    reply
        .message
        .iter()
        .skip(1)
        .map(|line| Extension::parse(line))
        .collect()
}
