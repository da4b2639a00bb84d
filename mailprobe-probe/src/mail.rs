//! Turning files in a delivery location into [`DetectedMail`].

use std::path::Path;

use tokio::fs;
use tokio::io::AsyncReadExt;

use mailprobe_common::payload::{Payload, unix_nanos};

use crate::error::DetectError;
use crate::types::DetectedMail;

/// How much of a file is read when looking for a payload. Anything larger
/// is someone else's mail; the cap keeps pathological inputs from chewing
/// memory.
pub const MAX_PARSE_BYTES: u64 = 8192;

/// Read a newly created file and parse it into a [`DetectedMail`], stamping
/// it with the current time as the moment of detection.
///
/// # Errors
///
/// [`DetectError`] for anything that is not a well-formed probe mail of
/// ours; callers are expected to skip such files silently.
pub async fn parse_detected(path: &Path) -> Result<DetectedMail, DetectError> {
    let received_nanos = unix_nanos();

    let file = fs::File::open(path).await?;
    let mut raw = Vec::with_capacity(1024);
    file.take(MAX_PARSE_BYTES).read_to_end(&mut raw).await?;

    let message = mailparse::parse_mail(&raw)?;
    let body = message.get_body_raw()?;
    // Delivery usually appends a trailing newline
    let payload = Payload::decode(body.trim_ascii()).map_err(|_| DetectError::NotOurs)?;

    Ok(DetectedMail {
        path: path.to_owned(),
        name: payload.name,
        token: payload.token,
        sent_nanos: payload.sent_nanos,
        received_nanos,
    })
}
