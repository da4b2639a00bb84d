//! Error types for the SMTP submission client.

use std::io;

use thiserror::Error;

/// Errors that can occur while submitting a probe mail.
#[derive(Error, Debug)]
pub enum ClientError {
    /// IO error during network operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The server's reply did not parse as an SMTP response.
    #[error("failed to parse SMTP response: {0}")]
    Parse(String),

    /// The server replied with an error or otherwise unexpected status code.
    #[error("unexpected SMTP reply: {code} {message}")]
    UnexpectedReply { code: u16, message: String },

    /// The connection closed mid-exchange.
    #[error("connection closed unexpectedly")]
    ConnectionClosed,

    /// The relay did not complete the exchange within the submission
    /// timeout.
    #[error("SMTP submission timed out")]
    Timeout,
}

/// Specialized `Result` type for SMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
