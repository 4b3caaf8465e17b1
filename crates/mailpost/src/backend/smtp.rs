//! SMTP delivery backend.

use std::any::Any;

use async_trait::async_trait;
use mailpost_message::Email;
use mailpost_smtp::{Connected, EnvelopeAddress, Session, connect};
use tracing::{debug, warn};

use crate::config::{BackendOptions, Value};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Hostname announced in EHLO.
const CLIENT_HOSTNAME: &str = "localhost";

/// Delivers messages over one SMTP session per send.
///
/// No connection survives between sends, so concurrent callers sharing one
/// transport each get an independent session.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    host: String,
    port: u16,
    use_tls: bool,
    username: Option<String>,
    password: Option<String>,
    default_sender: String,
}

impl SmtpTransport {
    /// Builds the transport from a filtered backend option map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credentials`] when exactly one of username and
    /// password is configured, or [`Error::Config`] for malformed options.
    pub fn from_options(options: &BackendOptions) -> Result<Self> {
        let username = opt_string(options, "username");
        let password = opt_string(options, "password");
        if username.is_some() != password.is_some() {
            return Err(Error::Credentials);
        }

        let port = match options.get("port") {
            None => 25,
            Some(value) => {
                let port = value
                    .as_int()
                    .ok_or_else(|| Error::Config("port must be an integer".to_string()))?;
                u16::try_from(port)
                    .map_err(|_| Error::Config(format!("port out of range: {port}")))?
            }
        };

        Ok(Self {
            host: string_or(options, "host", "localhost"),
            port,
            use_tls: options
                .get("use_tls")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            username,
            password,
            default_sender: string_or(options, "default_sender", "webmaster"),
        })
    }

    /// Backend factory for the registry.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::from_options`].
    pub fn factory(options: &BackendOptions) -> Result<Box<dyn Transport>> {
        Ok(Box::new(Self::from_options(options)?))
    }

    /// Acquires one ready-to-send session: connect, EHLO, authenticate if
    /// credentials are present, then negotiate TLS if configured.
    async fn open_session(&self) -> Result<Session<Connected>> {
        let stream = connect(&self.host, self.port).await?;
        let mut session = Session::open(stream).await?.ehlo(CLIENT_HOSTNAME).await?;

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            session.auth_plain(username, password).await?;
        }

        if self.use_tls {
            session = session.starttls(&self.host).await?;
        }

        Ok(session)
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, email: &mut Email) -> Result<()> {
        if email.from_addr().is_none() && !self.default_sender.is_empty() {
            email.set_from(self.default_sender.as_str())?;
        }

        // Serialize before touching the network; validation failures must
        // never reach the transport as delivery errors.
        let payload = email.to_message()?.to_bytes();
        let from = email
            .from_addr()
            .ok_or(mailpost_message::Error::Incomplete)?;
        let envelope_from = EnvelopeAddress::new(from.addr_spec())?;
        let recipients = email.recipients();

        let session = self.open_session().await?;
        let transaction = session.mail_from(&envelope_from).await?;

        let mut addresses = recipients.iter();
        let first = addresses.next().ok_or(mailpost_message::Error::Incomplete)?;
        let mut transaction = transaction
            .rcpt_to(&EnvelopeAddress::new(first.addr_spec())?)
            .await?;
        for address in addresses {
            transaction = transaction
                .rcpt_to(&EnvelopeAddress::new(address.addr_spec())?)
                .await?;
        }

        let session = transaction.data().await?.send_payload(&payload).await?;
        debug!(host = %self.host, recipients = recipients.len(), "message delivered");

        // Release: QUIT, degrading to a forced close (the drop) when the
        // server misbehaves during teardown.
        if let Err(err) = session.quit().await {
            warn!(error = %err, "QUIT failed, connection closed forcibly");
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn opt_string(options: &BackendOptions, key: &str) -> Option<String> {
    options
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn string_or(options: &BackendOptions, key: &str, default: &str) -> String {
    opt_string(options, key).unwrap_or_else(|| default.to_string())
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

    fn options(pairs: &[(&str, Value)]) -> BackendOptions {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn defaults_match_contract() {
        let transport = SmtpTransport::from_options(&BackendOptions::new()).unwrap();
        assert_eq!(transport.host, "localhost");
        assert_eq!(transport.port, 25);
        assert!(!transport.use_tls);
        assert_eq!(transport.username, None);
        assert_eq!(transport.password, None);
        assert_eq!(transport.default_sender, "webmaster");
    }

    #[test]
    fn username_without_password_is_rejected() {
        let err = SmtpTransport::from_options(&options(&[("username", Value::from("user"))]))
            .unwrap_err();
        assert!(matches!(err, Error::Credentials));
    }

    #[test]
    fn password_without_username_is_rejected() {
        let err = SmtpTransport::from_options(&options(&[("password", Value::from("secret"))]))
            .unwrap_err();
        assert!(matches!(err, Error::Credentials));
    }

    #[test]
    fn symmetric_credentials_are_accepted() {
        let transport = SmtpTransport::from_options(&options(&[
            ("username", Value::from("user")),
            ("password", Value::from("secret")),
        ]))
        .unwrap();
        assert_eq!(transport.username.as_deref(), Some("user"));
        assert_eq!(transport.password.as_deref(), Some("secret"));
    }

    #[test]
    fn empty_credentials_count_as_absent() {
        let transport = SmtpTransport::from_options(&options(&[
            ("username", Value::from("")),
            ("password", Value::from("")),
        ]))
        .unwrap();
        assert_eq!(transport.username, None);
        assert_eq!(transport.password, None);
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let err =
            SmtpTransport::from_options(&options(&[("port", Value::Int(70000))])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
