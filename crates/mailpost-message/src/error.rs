//! Error types for message construction.

/// Result type alias for message operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message construction error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Character encoding not supported for header text.
    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Domain could not be converted to its ASCII-Compatible Encoding.
    #[error("invalid internationalized domain: {0}")]
    InvalidDomain(String),

    /// A required mailing parameter is missing at serialization time.
    #[error("fill in mailing parameters first")]
    Incomplete,
}
