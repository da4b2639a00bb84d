//! Error types for the probe engine.

use std::io;

use thiserror::Error;

/// Why a file in a watched delivery location did not yield a
/// [`crate::DetectedMail`].
///
/// None of these are surfaced beyond a debug log: watched directories
/// receive arbitrary mail, and anything that is not one of our probes is
/// simply skipped.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The file could not be opened or read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file did not parse as a mail message.
    #[error("malformed mail message: {0}")]
    Mail(#[from] mailparse::MailParseError),

    /// The message parsed, but its body is not one of our payloads.
    #[error("not a probe mail of ours")]
    NotOurs,
}

/// Failures of the filesystem-notification layer.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),
}
