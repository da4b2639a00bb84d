//! The correlation payload carried inside probe mail bodies.
//!
//! A payload is the three fields `{target name, token, send timestamp}`
//! joined by [`FIELD_SEPARATOR`]. It is the only contract between the
//! sending and the detecting half of a probe: whatever the mail system does
//! in between, a body that decodes back into these three fields is one of
//! our probes, and everything else is somebody else's mail.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use thiserror::Error;

/// Byte joining the three payload fields.
pub const FIELD_SEPARATOR: u8 = b'-';

/// Length in bytes of a generated probe token.
pub const TOKEN_LENGTH: usize = 40;

/// Decode failures.
///
/// Watched directories receive arbitrary mail; anything that is not one of
/// our payloads decodes to [`PayloadError::NotOurs`] and is expected to be
/// skipped silently rather than surfaced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("no probe mail of ours")]
    NotOurs,
}

/// A random value identifying exactly one probe attempt.
///
/// Tokens are raw bytes and intentionally include non-printable values, so a
/// matched round-trip also verifies that the mail path is 8-bit clean. Some
/// bytes can never ride along, though: the field separator would split the
/// payload, `:` could turn a body that lands at the top of a message into a
/// header line, and bare CR/LF get rewritten by SMTP DATA line-ending
/// normalization before the far side ever sees them. All are replaced with a
/// harmless placeholder.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(Vec<u8>);

impl Token {
    /// Generate a fresh token of [`TOKEN_LENGTH`] bytes.
    ///
    /// Randomness comes from an OS-entropy seeded generator, so tokens do
    /// not repeat across process restarts; a leftover probe mail from an
    /// earlier run can therefore never match a current attempt.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with_length(TOKEN_LENGTH)
    }

    #[must_use]
    pub fn generate_with_length(length: usize) -> Self {
        let mut bytes = vec![0u8; length];
        rand::rng().fill_bytes(&mut bytes);

        for byte in &mut bytes {
            if matches!(*byte, FIELD_SEPARATOR | b':' | b'\r' | b'\n') {
                *byte = b'X';
            }
        }

        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Token {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens contain non-printable bytes; never write them verbatim
        write!(f, "Token(\"{}\")", self.0.escape_ascii())
    }
}

/// One decoded (or to-be-encoded) probe payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Name of the target configuration the probe was sent through.
    pub name: String,
    /// Token identifying this attempt.
    pub token: Token,
    /// Wall-clock send time, nanoseconds since the Unix epoch.
    pub sent_nanos: i64,
}

impl Payload {
    #[must_use]
    pub const fn new(name: String, token: Token, sent_nanos: i64) -> Self {
        Self {
            name,
            token,
            sent_nanos,
        }
    }

    /// Compose a payload for a fresh probe attempt: a new token, stamped
    /// with the current wall-clock time.
    #[must_use]
    pub fn compose(name: &str) -> Self {
        Self::new(name.to_owned(), Token::generate(), unix_nanos())
    }

    /// Encode into the wire form carried as the probe mail body.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let timestamp = self.sent_nanos.to_string();

        let mut wire = Vec::with_capacity(
            self.name.len() + self.token.as_bytes().len() + timestamp.len() + 2,
        );
        wire.extend_from_slice(self.name.as_bytes());
        wire.push(FIELD_SEPARATOR);
        wire.extend_from_slice(self.token.as_bytes());
        wire.push(FIELD_SEPARATOR);
        wire.extend_from_slice(timestamp.as_bytes());

        wire
    }

    /// Decode a mail body back into a payload.
    ///
    /// # Errors
    ///
    /// [`PayloadError::NotOurs`] when the input does not split into exactly
    /// three fields, the name is not valid UTF-8, or the third field is not
    /// an integer timestamp.
    pub fn decode(raw: &[u8]) -> Result<Self, PayloadError> {
        let fields: Vec<&[u8]> = raw.split(|byte| *byte == FIELD_SEPARATOR).collect();

        let [name, token, timestamp] = fields[..] else {
            return Err(PayloadError::NotOurs);
        };

        let name = std::str::from_utf8(name).map_err(|_| PayloadError::NotOurs)?;
        let sent_nanos = std::str::from_utf8(timestamp)
            .map_err(|_| PayloadError::NotOurs)?
            .parse::<i64>()
            .map_err(|_| PayloadError::NotOurs)?;

        Ok(Self::new(name.to_owned(), Token::from(token), sent_nanos))
    }
}

/// Current wall-clock time as nanoseconds since the Unix epoch.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn unix_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}
