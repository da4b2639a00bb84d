//! The probe–correlation engine.
//!
//! One [`Prober`] per configured target owns the send/await/resolve cycle;
//! a single shared [`Detector`] watches every target's delivery location and
//! routes parsed arrivals to the prober that owns them, keyed by the target
//! name carried in the payload.

pub mod detector;
pub mod error;
pub mod mail;
pub mod prober;
pub mod types;
pub mod watcher;

pub use detector::{DELIVERY_QUEUE_DEPTH, Detector};
pub use error::{DetectError, WatchError};
pub use prober::Prober;
pub use types::{DetectedMail, ProbeOutcome};
pub use watcher::MailWatcher;
