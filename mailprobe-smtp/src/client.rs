//! The SMTP client connection: command/reply plumbing over plain TCP.
//!
//! Probe relays are spoken to in cleartext, the same way the probes
//! themselves travel; there is no TLS path here.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{ClientError, Result};
use crate::response::Response;

/// Initial size of the read buffer for SMTP replies.
const BUFFER_SIZE: usize = 4096;

/// Maximum size of the read buffer to prevent unbounded growth.
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// An SMTP client driving one submission over a TCP connection.
pub struct SmtpClient {
    stream: TcpStream,
    buffer: Vec<u8>,
    buffer_pos: usize,
}

impl SmtpClient {
    /// Connect to the relay at `addr` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;

        Ok(Self {
            stream,
            buffer: vec![0u8; BUFFER_SIZE],
            buffer_pos: 0,
        })
    }

    /// Read the server greeting that opens the session.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the greeting is malformed.
    pub async fn read_greeting(&mut self) -> Result<Response> {
        self.read_response().await
    }

    /// Send one command line and read the reply to it.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        self.stream
            .write_all(format!("{command}\r\n").as_bytes())
            .await?;
        self.read_response().await
    }

    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn ehlo(&mut self, domain: &str) -> Result<Response> {
        self.command(&format!("EHLO {domain}")).await
    }

    /// Authenticate with the AUTH PLAIN initial-response form.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn auth_plain(&mut self, login: &str, passphrase: &str) -> Result<Response> {
        let mut identity = Vec::with_capacity(login.len() + passphrase.len() + 2);
        identity.push(0);
        identity.extend_from_slice(login.as_bytes());
        identity.push(0);
        identity.extend_from_slice(passphrase.as_bytes());

        self.command(&format!("AUTH PLAIN {}", base64(&identity)))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn mail_from(&mut self, from: &str) -> Result<Response> {
        self.command(&format!("MAIL FROM:<{from}>")).await
    }

    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response> {
        self.command(&format!("RCPT TO:<{to}>")).await
    }

    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn data(&mut self) -> Result<Response> {
        self.command("DATA").await
    }

    /// Send the message content followed by the end-of-data marker.
    ///
    /// The content is dot-stuffed and CRLF-terminated on the way out so raw
    /// binary survives the DATA section intact.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_data(&mut self, data: &[u8]) -> Result<Response> {
        self.stream.write_all(&dot_stuff(data)).await?;
        self.stream.write_all(b".\r\n").await?;
        self.read_response().await
    }

    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn quit(&mut self) -> Result<Response> {
        self.command("QUIT").await
    }

    /// Read one complete (possibly multi-line) reply from the server.
    async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some((response, consumed)) = Response::parse(&self.buffer[..self.buffer_pos])? {
                self.buffer.copy_within(consumed..self.buffer_pos, 0);
                self.buffer_pos -= consumed;
                return Ok(response);
            }

            if self.buffer_pos >= self.buffer.len() {
                let new_size = self.buffer.len() * 2;
                if new_size > MAX_BUFFER_SIZE {
                    return Err(ClientError::Parse(format!(
                        "reply exceeds {MAX_BUFFER_SIZE} bytes"
                    )));
                }
                self.buffer.resize(new_size, 0);
            }

            let read = self.stream.read(&mut self.buffer[self.buffer_pos..]).await?;
            if read == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            self.buffer_pos += read;
        }
    }
}

/// Prefix every line starting with `.` by another `.` (RFC 5321 §4.5.2) and
/// make sure the content ends with CRLF so the end-of-data marker sits on a
/// line of its own.
fn dot_stuff(data: &[u8]) -> Vec<u8> {
    let mut stuffed = Vec::with_capacity(data.len() + 8);
    let mut at_line_start = true;

    for &byte in data {
        if at_line_start && byte == b'.' {
            stuffed.push(b'.');
        }
        stuffed.push(byte);
        at_line_start = byte == b'\n';
    }

    if !stuffed.ends_with(b"\r\n") {
        stuffed.extend_from_slice(b"\r\n");
    }

    stuffed
}

/// Base64 without line wrapping, enough for an AUTH PLAIN initial response.
fn base64(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    let mut encoded = String::with_capacity(data.len().div_ceil(3) * 4);

    for chunk in data.chunks(3) {
        let mut buf = [0u8; 3];
        buf[..chunk.len()].copy_from_slice(chunk);

        encoded.push(ALPHABET[usize::from(buf[0] >> 2)] as char);
        encoded.push(ALPHABET[usize::from(((buf[0] & 0x03) << 4) | (buf[1] >> 4))] as char);
        encoded.push(if chunk.len() > 1 {
            ALPHABET[usize::from(((buf[1] & 0x0f) << 2) | (buf[2] >> 6))] as char
        } else {
            '='
        });
        encoded.push(if chunk.len() > 2 {
            ALPHABET[usize::from(buf[2] & 0x3f)] as char
        } else {
            '='
        });
    }

    encoded
}
