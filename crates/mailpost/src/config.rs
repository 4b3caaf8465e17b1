//! Prefix-scoped mailer configuration.
//!
//! Settings live in a flat, case-insensitive key-value store owned by the
//! host application. The mailer reads its options once at initialization
//! under `<PREFIX>_<NAME>` keys and treats them as immutable afterwards.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration prefix.
pub const DEFAULT_PREFIX: &str = "MAILER";

/// Identifier of the SMTP backend.
pub const SMTP_BACKEND: &str = "smtp";

/// Identifier of the in-memory capture backend.
pub const DUMMY_BACKEND: &str = "dummy";

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// Integer option (ports and friends).
    Int(i64),
    /// String option.
    Str(String),
}

impl Value {
    /// The boolean value, if this is a flag.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer value, if this is a number.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The string value, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u16> for Value {
    fn from(port: u16) -> Self {
        Self::Int(i64::from(port))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Flat application settings with case-insensitive keys.
///
/// Keys are stored in their upper-cased canonical form.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, Value>,
}

impl Settings {
    /// Creates an empty settings store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, replacing any existing one.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_uppercase(), value.into());
    }

    /// Sets a value only when the key is not present yet.
    pub fn setdefault(&mut self, key: &str, value: impl Into<Value>) {
        self.values
            .entry(key.to_uppercase())
            .or_insert_with(|| value.into());
    }

    /// Looks a value up, case-insensitively.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&key.to_uppercase())
    }

    /// True when the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&key.to_uppercase())
    }
}

/// Returns the canonical settings key for a prefixed option name.
#[must_use]
pub fn config_key(prefix: &str, name: &str) -> String {
    format!("{prefix}_{name}").to_uppercase()
}

/// The filtered, prefix-stripped, lower-cased option map handed to a
/// backend factory.
pub type BackendOptions = BTreeMap<String, Value>;

/// Typed mailer options, read once at facade-initialization time.
#[derive(Debug, Clone)]
pub struct MailerOptions {
    /// Whether the host application runs in testing mode.
    pub testing: bool,
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Whether to negotiate STARTTLS.
    pub use_tls: bool,
    /// Authentication username, if any.
    pub username: Option<String>,
    /// Authentication password, if any.
    pub password: Option<String>,
    /// Sender substituted into messages without one.
    pub default_sender: String,
    /// Identifier of the backend to construct.
    pub backend: String,
}

impl MailerOptions {
    /// Reads the options for `prefix`, seeding missing keys with their
    /// defaults so later readers observe them.
    ///
    /// `TESTING` inherits the host application's unprefixed `TESTING` flag
    /// and, when set, forces the capture backend regardless of any
    /// explicitly configured one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a present option has the wrong type.
    pub fn from_settings(settings: &mut Settings, prefix: &str) -> Result<Self> {
        let app_testing = settings
            .get("TESTING")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        settings.setdefault(&config_key(prefix, "TESTING"), app_testing);
        settings.setdefault(&config_key(prefix, "HOST"), "localhost");
        settings.setdefault(&config_key(prefix, "PORT"), 25_i64);
        settings.setdefault(&config_key(prefix, "USE_TLS"), false);
        settings.setdefault(&config_key(prefix, "DEFAULT_SENDER"), "webmaster");
        settings.setdefault(&config_key(prefix, "BACKEND"), SMTP_BACKEND);

        let testing = get_bool(settings, prefix, "TESTING")?;
        if testing {
            // Tests must never hit a real backend.
            settings.set(&config_key(prefix, "BACKEND"), DUMMY_BACKEND);
        }

        let port = get_int(settings, prefix, "PORT")?;
        let port = u16::try_from(port)
            .map_err(|_| Error::Config(format!("{} out of range: {port}", config_key(prefix, "PORT"))))?;

        Ok(Self {
            testing,
            host: get_str(settings, prefix, "HOST")?,
            port,
            use_tls: get_bool(settings, prefix, "USE_TLS")?,
            username: get_opt_str(settings, prefix, "USERNAME")?,
            password: get_opt_str(settings, prefix, "PASSWORD")?,
            default_sender: get_str(settings, prefix, "DEFAULT_SENDER")?,
            backend: get_str(settings, prefix, "BACKEND")?,
        })
    }

    /// The option map a backend factory receives: recognized names only,
    /// prefix stripped, keys lower-cased.
    #[must_use]
    pub fn backend_options(&self) -> BackendOptions {
        let mut options = BackendOptions::new();
        options.insert("host".to_string(), Value::from(self.host.as_str()));
        options.insert("port".to_string(), Value::from(self.port));
        options.insert("use_tls".to_string(), Value::from(self.use_tls));
        options.insert(
            "default_sender".to_string(),
            Value::from(self.default_sender.as_str()),
        );
        if let Some(username) = &self.username {
            options.insert("username".to_string(), Value::from(username.as_str()));
        }
        if let Some(password) = &self.password {
            options.insert("password".to_string(), Value::from(password.as_str()));
        }
        options
    }
}

fn get_bool(settings: &Settings, prefix: &str, name: &str) -> Result<bool> {
    let key = config_key(prefix, name);
    settings.get(&key).map_or(Ok(false), |value| {
        value
            .as_bool()
            .ok_or_else(|| Error::Config(format!("{key} must be a boolean")))
    })
}

fn get_int(settings: &Settings, prefix: &str, name: &str) -> Result<i64> {
    let key = config_key(prefix, name);
    settings.get(&key).map_or(Ok(0), |value| {
        value
            .as_int()
            .ok_or_else(|| Error::Config(format!("{key} must be an integer")))
    })
}

fn get_str(settings: &Settings, prefix: &str, name: &str) -> Result<String> {
    let key = config_key(prefix, name);
    settings.get(&key).map_or_else(
        || Ok(String::new()),
        |value| {
            value
                .as_str()
                .map(ToString::to_string)
                .ok_or_else(|| Error::Config(format!("{key} must be a string")))
        },
    )
}

fn get_opt_str(settings: &Settings, prefix: &str, name: &str) -> Result<Option<String>> {
    let key = config_key(prefix, name);
    match settings.get(&key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| {
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            })
            .ok_or_else(|| Error::Config(format!("{key} must be a string"))),
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
    fn config_key_is_uppercased() {
        assert_eq!(config_key("mailer", "host"), "MAILER_HOST");
        assert!(config_key("mailer", "port").chars().all(|c| !c.is_lowercase()));
    }

    #[test]
    fn settings_keys_are_case_insensitive() {
        let mut settings = Settings::new();
        settings.set("Mailer_Host", "mx.example.com");
        assert_eq!(
            settings.get("MAILER_HOST").and_then(Value::as_str),
            Some("mx.example.com")
        );
    }

    #[test]
    fn setdefault_does_not_override() {
        let mut settings = Settings::new();
        settings.set("MAILER_PORT", 2525_i64);
        settings.setdefault("MAILER_PORT", 25_i64);
        assert_eq!(
            settings.get("MAILER_PORT").and_then(Value::as_int),
            Some(2525)
        );
    }

    #[test]
    fn defaults_are_seeded_and_read_back() {
        let mut settings = Settings::new();
        let options = MailerOptions::from_settings(&mut settings, DEFAULT_PREFIX).unwrap();

        assert!(!options.testing);
        assert_eq!(options.host, "localhost");
        assert_eq!(options.port, 25);
        assert!(!options.use_tls);
        assert_eq!(options.username, None);
        assert_eq!(options.password, None);
        assert_eq!(options.default_sender, "webmaster");
        assert_eq!(options.backend, SMTP_BACKEND);

        // Defaults were written back into the store.
        assert!(settings.contains("MAILER_HOST"));
        assert!(settings.contains("MAILER_BACKEND"));
    }

    #[test]
    fn testing_flag_is_inherited_from_application() {
        let mut settings = Settings::new();
        settings.set("TESTING", true);
        let options = MailerOptions::from_settings(&mut settings, DEFAULT_PREFIX).unwrap();
        assert!(options.testing);
        assert_eq!(options.backend, DUMMY_BACKEND);
    }

    #[test]
    fn testing_overrides_explicit_backend() {
        let mut settings = Settings::new();
        settings.set("MAILER_TESTING", true);
        settings.set("MAILER_BACKEND", "smtp");
        let options = MailerOptions::from_settings(&mut settings, DEFAULT_PREFIX).unwrap();
        assert_eq!(options.backend, DUMMY_BACKEND);
    }

    #[test]
    fn prefixes_are_scoped_independently() {
        let mut settings = Settings::new();
        settings.set("MAILER_HOST", "one.example.com");
        settings.set("BULK_HOST", "two.example.com");

        let one = MailerOptions::from_settings(&mut settings, "MAILER").unwrap();
        let two = MailerOptions::from_settings(&mut settings, "BULK").unwrap();
        assert_eq!(one.host, "one.example.com");
        assert_eq!(two.host, "two.example.com");
    }

    #[test]
    fn wrong_type_is_a_config_error() {
        let mut settings = Settings::new();
        settings.set("MAILER_PORT", "not a port");
        let err = MailerOptions::from_settings(&mut settings, DEFAULT_PREFIX).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn backend_options_are_filtered_and_lowercased() {
        let mut settings = Settings::new();
        settings.set("MAILER_USERNAME", "user");
        settings.set("MAILER_PASSWORD", "secret");
        let options = MailerOptions::from_settings(&mut settings, DEFAULT_PREFIX).unwrap();

        let backend_options = options.backend_options();
        assert_eq!(
            backend_options.get("host").and_then(Value::as_str),
            Some("localhost")
        );
        assert_eq!(
            backend_options.get("username").and_then(Value::as_str),
            Some("user")
        );
        // The backend identifier itself is not an option.
        assert!(!backend_options.contains_key("backend"));
        assert!(backend_options.keys().all(|k| k.chars().all(|c| !c.is_uppercase())));
    }

    #[test]
    fn empty_credentials_count_as_absent() {
        let mut settings = Settings::new();
        settings.set("MAILER_USERNAME", "");
        let options = MailerOptions::from_settings(&mut settings, DEFAULT_PREFIX).unwrap();
        assert_eq!(options.username, None);
    }
}
