//! Capability interfaces consumed by the probe engine.
//!
//! The engine never talks to a concrete SMTP client or metrics backend;
//! it is handed these at construction, which keeps the send/await/resolve
//! machinery testable without a relay or a collector in the loop.

use async_trait::async_trait;

/// Dispatches one raw probe message towards its target's relay.
///
/// An implementation carries its own relay address and envelope; the engine
/// only supplies the message bytes. Send failures are reported to the
/// caller, which logs and swallows them — a probe that could not be sent
/// surfaces as a delivery timeout, same as one that was sent and lost.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Submit `message` as the body of one probe mail.
    ///
    /// # Errors
    ///
    /// Any transport-level failure; never retried by the engine.
    async fn send(&self, message: &[u8]) -> anyhow::Result<()>;
}

/// Health observations produced by the probe engine, labeled per target.
///
/// Gauge semantics throughout: only the latest value per target is retained,
/// plus a monotonic late-mail counter and a latency distribution sample.
pub trait MetricsSink: Send + Sync {
    /// Touch this target's series at startup so they exist before the
    /// first probe completes.
    fn register_target(&self, target: &str);

    /// Whether the last probe mail was delivered within its timeout.
    fn set_delivery_success(&self, target: &str, delivered: bool);

    /// Detection time of the most recent probe mail, seconds since the
    /// Unix epoch.
    fn set_last_deliver_time(&self, target: &str, unix_seconds: f64);

    /// Round-trip duration of the most recent probe mail, in milliseconds.
    fn set_last_deliver_duration(&self, target: &str, millis: f64);

    /// Feed one round-trip duration into the latency distribution.
    fn observe_deliver_duration(&self, target: &str, millis: f64);

    /// Count one arrival whose token did not match the awaited attempt.
    fn inc_late_mail(&self, target: &str);
}
