//! Probe outcome metrics
//!
//! One instrument per observation the probe engine reports:
//! - whether the last probe mail per target was delivered
//! - detection time and round-trip duration of the last delivered mail
//! - a round-trip latency distribution
//! - a counter of late (token-mismatched) arrivals

use opentelemetry::{
    KeyValue,
    metrics::{Counter, Gauge, Histogram, Meter},
};

use mailprobe_common::traits::MetricsSink;

/// Upper bound of the latency histogram, in milliseconds.
const HISTOGRAM_UPPER_BOUND_MS: f64 = 100_000.0;

/// Width of one latency histogram bucket, in milliseconds.
const HISTOGRAM_BUCKET_MS: f64 = 50.0;

/// The OpenTelemetry-backed [`MetricsSink`].
#[derive(Debug)]
pub struct ProbeMetrics {
    /// 1 when the last probe mail for a target arrived in time, else 0
    delivery_success: Gauge<u64>,

    /// Detection timestamp (unix seconds) of the last received probe mail
    last_deliver_time: Gauge<f64>,

    /// Round-trip duration (ms) of the last received probe mail
    last_deliver_duration: Gauge<f64>,

    /// Distribution of probe round-trip durations (ms)
    deliver_durations: Histogram<f64>,

    /// Number of probe mails that arrived after their attempt resolved
    late_mails: Counter<u64>,
}

impl ProbeMetrics {
    /// Create the probe instruments on the global meter.
    #[must_use]
    pub fn new() -> Self {
        let meter = meter();

        let delivery_success = meter
            .u64_gauge("mailprobe.delivery.success")
            .with_description("Whether the last probe mail was delivered successfully")
            .build();

        let last_deliver_time = meter
            .f64_gauge("mailprobe.delivery.last_time.seconds")
            .with_description("Detection time of the last correctly received probe mail")
            .with_unit("s")
            .build();

        let last_deliver_duration = meter
            .f64_gauge("mailprobe.delivery.last_duration.milliseconds")
            .with_description("Round-trip duration of the last correctly received probe mail")
            .with_unit("ms")
            .build();

        let deliver_durations = meter
            .f64_histogram("mailprobe.delivery.duration.milliseconds")
            .with_description("Distribution of probe mail round-trip durations")
            .with_unit("ms")
            .with_boundaries(linear_buckets(HISTOGRAM_UPPER_BOUND_MS, HISTOGRAM_BUCKET_MS))
            .build();

        let late_mails = meter
            .u64_counter("mailprobe.late_mails.total")
            .with_description("Number of probe mails received after their attempt resolved")
            .build();

        Self {
            delivery_success,
            last_deliver_time,
            last_deliver_duration,
            deliver_durations,
            late_mails,
        }
    }
}

impl Default for ProbeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for ProbeMetrics {
    fn register_target(&self, target: &str) {
        // Touching the counter makes the series exist before the first
        // probe resolves. The gauges are left alone: a pre-seeded 0/1 would
        // assert a delivery verdict no probe has produced.
        self.late_mails.add(0, &attributes(target));
    }

    fn set_delivery_success(&self, target: &str, delivered: bool) {
        self.delivery_success
            .record(u64::from(delivered), &attributes(target));
    }

    fn set_last_deliver_time(&self, target: &str, unix_seconds: f64) {
        self.last_deliver_time
            .record(unix_seconds, &attributes(target));
    }

    fn set_last_deliver_duration(&self, target: &str, millis: f64) {
        self.last_deliver_duration
            .record(millis, &attributes(target));
    }

    fn observe_deliver_duration(&self, target: &str, millis: f64) {
        self.deliver_durations.record(millis, &attributes(target));
    }

    fn inc_late_mail(&self, target: &str) {
        self.late_mails.add(1, &attributes(target));
    }
}

fn attributes(target: &str) -> [KeyValue; 1] {
    [KeyValue::new("target", target.to_string())]
}

/// Linearly spaced histogram bucket boundaries: `width`, `2 * width`, ...
/// up to `upper_bound`.
fn linear_buckets(upper_bound: f64, width: f64) -> Vec<f64> {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "bucket counts are small positive integers"
    )]
    let bins = (upper_bound / width) as usize;

    (1..=bins).map(|bin| width * bin as f64).collect()
}

/// Get the OpenTelemetry meter for probe metrics
fn meter() -> Meter {
    opentelemetry::global::meter("mailprobe")
}
