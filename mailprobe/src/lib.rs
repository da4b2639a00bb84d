//! mailprobe: a synthetic-transaction health prober for outbound mail.
//!
//! Every monitoring interval, a uniquely tagged probe mail is injected into
//! each configured relay; a shared detector watches the corresponding
//! delivery locations and routes arrivals back to the prober awaiting them.
//! The observed round-trips become live health metrics.

pub mod controller;

pub use controller::Mailprobe;
