//! Error types for the LMTP client.

use std::io;

use thiserror::Error;

/// Errors that can occur when talking to an LMTP server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// IO error occurred during network operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse a reply from the server.
    #[error("Failed to parse LMTP response: {0}")]
    ParseError(String),

    /// The server returned a status code the session cannot continue from.
    #[error("Unexpected LMTP status code: {code} - {message}")]
    UnexpectedResponse { code: u16, message: String },

    /// The configured server address is not usable.
    #[error("Invalid LMTP address '{0}'")]
    InvalidAddress(String),

    /// Connection was closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

/// Specialized `Result` type for LMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
