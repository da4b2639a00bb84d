//! SMTP reply parsing and classification.

use crate::error::{ClientError, Result};

/// A complete SMTP reply, possibly spanning several continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The SMTP status code.
    pub code: u16,
    /// All message lines in the reply.
    pub lines: Vec<String>,
}

impl Response {
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// The reply text as one string, lines joined by newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// `true` for a 2xx completion reply.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// `true` for a 3xx intermediate reply (e.g. 354 after DATA).
    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        self.code >= 300 && self.code < 400
    }

    /// Consume the reply, requiring a 2xx completion code.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnexpectedReply`] for any non-2xx code.
    pub fn completed(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::UnexpectedReply {
                code: self.code,
                message: self.message(),
            })
        }
    }

    /// Consume the reply, requiring a 3xx intermediate code.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnexpectedReply`] for any non-3xx code.
    pub fn intermediate(self) -> Result<Self> {
        if self.is_intermediate() {
            Ok(self)
        } else {
            Err(ClientError::UnexpectedReply {
                code: self.code,
                message: self.message(),
            })
        }
    }

    /// Try to parse one complete reply from the front of `buffer`.
    ///
    /// Returns the reply and the number of bytes consumed, or `None` when
    /// the buffer does not yet hold a complete reply.
    ///
    /// # Errors
    ///
    /// [`ClientError::Parse`] when the buffered data is not valid SMTP.
    pub fn parse(buffer: &[u8]) -> Result<Option<(Self, usize)>> {
        let mut consumed = 0;
        let mut code = None;
        let mut lines = Vec::new();

        loop {
            let rest = &buffer[consumed..];
            let Some(end) = rest.iter().position(|byte| *byte == b'\n') else {
                // No full line buffered yet
                return Ok(None);
            };

            let line = std::str::from_utf8(&rest[..end])
                .map_err(|err| ClientError::Parse(err.to_string()))?
                .trim_end_matches('\r');
            consumed += end + 1;

            let (line_code, last, message) = parse_line(line)?;

            match code {
                None => code = Some(line_code),
                Some(code) if code != line_code => {
                    return Err(ClientError::Parse(format!(
                        "status code changed mid-reply: {code} then {line_code}"
                    )));
                }
                Some(_) => {}
            }

            lines.push(message.to_owned());

            if last {
                return Ok(Some((
                    Self::new(code.unwrap_or_default(), lines),
                    consumed,
                )));
            }
        }
    }
}

/// Split one reply line into `(code, is-last-line, message)`.
fn parse_line(line: &str) -> Result<(u16, bool, &str)> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(ClientError::Parse(format!(
            "reply line does not start with a status code: {line:?}"
        )));
    }

    let code = line[..3]
        .parse::<u16>()
        .map_err(|_| ClientError::Parse(format!("invalid status code in {line:?}")))?;

    match line.as_bytes().get(3) {
        None => Ok((code, true, "")),
        Some(b' ') => Ok((code, true, &line[4..])),
        Some(b'-') => Ok((code, false, &line[4..])),
        Some(_) => Err(ClientError::Parse(format!(
            "invalid separator after status code in {line:?}"
        ))),
    }
}
