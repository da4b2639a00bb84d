//! Plain-TCP SMTP submission, just enough to hand a probe mail to a relay.

pub mod client;
pub mod error;
pub mod response;
pub mod sender;

pub use client::SmtpClient;
pub use error::ClientError;
pub use response::Response;
pub use sender::SmtpSender;
