//! Configuration types shared across the mailprobe workspace.
//!
//! The top-level binary deserializes these from TOML and hands them to each
//! component at construction; nothing reads configuration from process-wide
//! state after startup.

use std::{collections::HashSet, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::payload::FIELD_SEPARATOR;

/// One probed relay and the delivery location its mail is expected in.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// The name probe attempts through this relay are classified with.
    ///
    /// Used as the metric label and as the routing key between the detector
    /// and this target's prober; must be unique across all targets.
    pub name: String,

    /// Hostname or address of the SMTP relay.
    pub server: String,

    /// Port of the SMTP relay.
    ///
    /// Default: 25
    #[serde(default = "defaults::smtp_port")]
    pub port: u16,

    /// Username for relay authentication. Empty disables AUTH.
    #[serde(default)]
    pub login: String,

    /// Passphrase for relay authentication.
    #[serde(default)]
    pub passphrase: String,

    /// Sender address for probe mail.
    pub from: String,

    /// Destination address probe mail is sent to.
    pub to: String,

    /// Directory mail sent through this relay ends up in when delivered
    /// correctly.
    pub detection_dir: PathBuf,
}

impl TargetConfig {
    /// The relay's `host:port` dial address.
    #[must_use]
    pub fn relay_addr(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

/// Probe cycle timing knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct Timings {
    /// Time to wait between probe attempts, per target.
    ///
    /// Default: 60 seconds
    #[serde(default = "defaults::monitoring_interval_secs")]
    pub monitoring_interval_secs: u64,

    /// Delay between starting the per-target probe workers, so targets do
    /// not all burst their probes at the same instant.
    ///
    /// Default: 1000 milliseconds
    #[serde(default = "defaults::startup_offset_millis")]
    pub startup_offset_millis: u64,

    /// How long after sending a probe its delivery is awaited before the
    /// attempt is reported as failed.
    ///
    /// Default: 10 seconds
    #[serde(default = "defaults::mail_check_timeout_secs")]
    pub mail_check_timeout_secs: u64,
}

impl Timings {
    #[must_use]
    pub const fn monitoring_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring_interval_secs)
    }

    #[must_use]
    pub const fn startup_offset(&self) -> Duration {
        Duration::from_millis(self.startup_offset_millis)
    }

    #[must_use]
    pub const fn mail_check_timeout(&self) -> Duration {
        Duration::from_secs(self.mail_check_timeout_secs)
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            monitoring_interval_secs: defaults::monitoring_interval_secs(),
            startup_offset_millis: defaults::startup_offset_millis(),
            mail_check_timeout_secs: defaults::mail_check_timeout_secs(),
        }
    }
}

mod defaults {
    pub(super) const fn smtp_port() -> u16 {
        25
    }

    pub(super) const fn monitoring_interval_secs() -> u64 {
        60
    }

    pub(super) const fn startup_offset_millis() -> u64 {
        1000
    }

    pub(super) const fn mail_check_timeout_secs() -> u64 {
        10
    }
}

/// Target-list validation failures. All of these are fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no probe targets configured")]
    NoTargets,

    /// Two targets sharing a name would silently merge their probe traffic
    /// in the routing map.
    #[error("duplicate target name: {0:?}")]
    DuplicateName(String),

    /// A name containing the payload field separator can never round-trip
    /// through the codec.
    #[error("target name {0:?} contains the reserved separator character")]
    SeparatorInName(String),
}

/// Validate the configured target list against the routing and payload
/// invariants.
///
/// # Errors
///
/// See [`ConfigError`].
pub fn validate_targets(targets: &[TargetConfig]) -> Result<(), ConfigError> {
    if targets.is_empty() {
        return Err(ConfigError::NoTargets);
    }

    let mut seen = HashSet::with_capacity(targets.len());
    for target in targets {
        if target.name.as_bytes().contains(&FIELD_SEPARATOR) {
            return Err(ConfigError::SeparatorInName(target.name.clone()));
        }

        if !seen.insert(target.name.as_str()) {
            return Err(ConfigError::DuplicateName(target.name.clone()));
        }
    }

    Ok(())
}
