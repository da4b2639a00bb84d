//! Core data carried between the detector and the probers.

use std::path::PathBuf;

use mailprobe_common::payload::Token;

/// A successfully parsed probe mail found in a watched delivery location.
///
/// Built by the detector for every decodable arrival; ownership moves to
/// the matching prober over that target's routing channel. The artifact on
/// disk is deleted only by a prober that confirms this is the mail it was
/// awaiting.
#[derive(Debug, Clone)]
pub struct DetectedMail {
    /// Path of the mail file on disk.
    pub path: PathBuf,
    /// Target name decoded from the payload; the routing key.
    pub name: String,
    /// Token decoded from the payload.
    pub token: Token,
    /// Send time decoded from the payload, nanoseconds since the Unix epoch.
    pub sent_nanos: i64,
    /// Time the mail was detected, nanoseconds since the Unix epoch.
    pub received_nanos: i64,
}

/// How one probe cycle resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The awaited mail arrived within the timeout.
    Matched,
    /// The timeout elapsed first.
    TimedOut,
}
