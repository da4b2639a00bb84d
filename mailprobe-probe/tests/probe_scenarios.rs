//! End-to-end probe cycles against recording collaborators: the matched,
//! late, and timed-out paths, plus transport failure.

mod support;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use mailprobe_common::{
    config::{TargetConfig, Timings},
    payload::{Payload, Token},
};
use mailprobe_probe::{DELIVERY_QUEUE_DEPTH, DetectedMail, ProbeOutcome, Prober};

use support::{RecordingSender, RecordingSink};

fn target(name: &str) -> TargetConfig {
    TargetConfig {
        name: name.to_owned(),
        server: "relay.example.com".to_owned(),
        port: 25,
        login: String::new(),
        passphrase: String::new(),
        from: "probe@example.com".to_owned(),
        to: "inbox@example.com".to_owned(),
        detection_dir: PathBuf::from("/var/mail/inbox"),
    }
}

fn timings(mail_check_timeout_secs: u64) -> Timings {
    Timings {
        monitoring_interval_secs: 60,
        startup_offset_millis: 0,
        mail_check_timeout_secs,
    }
}

fn artifact(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"probe artifact").unwrap();
    path
}

/// A `DetectedMail` for `alpha` arriving `elapsed_millis` after its own
/// send stamp.
fn arrival(path: &Path, token: Token, sent_nanos: i64, elapsed_millis: i64) -> DetectedMail {
    DetectedMail {
        path: path.to_owned(),
        name: "alpha".to_owned(),
        token,
        sent_nanos,
        received_nanos: sent_nanos + elapsed_millis * 1_000_000,
    }
}

#[tokio::test]
async fn matched_arrival_reports_success_and_deletes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (deliveries, rx) = mpsc::channel(DELIVERY_QUEUE_DEPTH);
    let sender = Arc::new(RecordingSender::default());
    let sink = Arc::new(RecordingSink::default());

    let mut prober = Prober::new(target("alpha"), timings(2), sender.clone(), sink.clone(), rx);
    let cycle = tokio::spawn(async move { prober.probe().await });

    // The attempt's token travels inside the sent payload
    let sent = Payload::decode(&sender.first_payload().await).unwrap();
    let path = artifact(&dir, "probe.eml");
    deliveries
        .send(arrival(&path, sent.token, sent.sent_nanos, 1000))
        .await
        .unwrap();

    assert_eq!(cycle.await.unwrap(), ProbeOutcome::Matched);
    assert!(!path.exists(), "matched artifact must be deleted");

    let seen = sink.snapshot();
    assert_eq!(seen.delivery_success, vec![("alpha".to_owned(), true)]);
    assert_eq!(seen.last_deliver_durations, vec![("alpha".to_owned(), 1000.0)]);
    assert_eq!(seen.observed_durations, vec![("alpha".to_owned(), 1000.0)]);
    assert!(seen.late_mails.is_empty());
}

#[tokio::test]
async fn stale_arrival_counts_late_and_the_seek_loop_continues() {
    let dir = tempfile::tempdir().unwrap();
    let (deliveries, rx) = mpsc::channel(DELIVERY_QUEUE_DEPTH);
    let sender = Arc::new(RecordingSender::default());
    let sink = Arc::new(RecordingSink::default());

    let mut prober = Prober::new(target("alpha"), timings(2), sender.clone(), sink.clone(), rx);
    let cycle = tokio::spawn(async move { prober.probe().await });

    let sent = Payload::decode(&sender.first_payload().await).unwrap();

    // A leftover from some earlier cycle arrives first
    let stale_path = artifact(&dir, "stale.eml");
    deliveries
        .send(arrival(&stale_path, Token::generate(), sent.sent_nanos, 500))
        .await
        .unwrap();

    // ...then the mail actually being awaited
    let path = artifact(&dir, "probe.eml");
    deliveries
        .send(arrival(&path, sent.token, sent.sent_nanos, 1000))
        .await
        .unwrap();

    assert_eq!(cycle.await.unwrap(), ProbeOutcome::Matched);

    let seen = sink.snapshot();
    assert_eq!(seen.late_mails, vec!["alpha".to_owned()]);
    assert_eq!(seen.delivery_success, vec![("alpha".to_owned(), true)]);
    // Both arrivals refreshed the last-seen observations, in order
    assert_eq!(
        seen.last_deliver_durations,
        vec![("alpha".to_owned(), 500.0), ("alpha".to_owned(), 1000.0)]
    );
    assert!(
        stale_path.exists(),
        "late artifacts stay on disk for external cleanup"
    );
    assert!(!path.exists());
}

#[tokio::test]
async fn timeout_reports_failure_and_deletes_nothing() {
    let (_deliveries, rx) = mpsc::channel(DELIVERY_QUEUE_DEPTH);
    let sender = Arc::new(RecordingSender::default());
    let sink = Arc::new(RecordingSink::default());

    let mut prober = Prober::new(target("alpha"), timings(1), sender.clone(), sink.clone(), rx);

    assert_eq!(prober.probe().await, ProbeOutcome::TimedOut);

    let seen = sink.snapshot();
    assert_eq!(seen.delivery_success, vec![("alpha".to_owned(), false)]);
    assert!(seen.late_mails.is_empty());
    assert!(seen.last_deliver_durations.is_empty());
}

#[tokio::test]
async fn transport_failure_is_swallowed_and_surfaces_as_timeout() {
    let (_deliveries, rx) = mpsc::channel(DELIVERY_QUEUE_DEPTH);
    let sender = Arc::new(RecordingSender::failing());
    let sink = Arc::new(RecordingSink::default());

    let mut prober = Prober::new(target("alpha"), timings(1), sender.clone(), sink.clone(), rx);

    assert_eq!(prober.probe().await, ProbeOutcome::TimedOut);

    // The send was attempted exactly once, never retried
    assert_eq!(sender.sent().len(), 1);
    assert_eq!(
        sink.snapshot().delivery_success,
        vec![("alpha".to_owned(), false)]
    );
}

#[tokio::test]
async fn closed_delivery_channel_still_honors_the_deadline() {
    let (deliveries, rx) = mpsc::channel::<DetectedMail>(DELIVERY_QUEUE_DEPTH);
    let sender = Arc::new(RecordingSender::default());
    let sink = Arc::new(RecordingSink::default());

    let mut prober = Prober::new(target("alpha"), timings(1), sender.clone(), sink.clone(), rx);
    drop(deliveries);

    let started = std::time::Instant::now();
    assert_eq!(prober.probe().await, ProbeOutcome::TimedOut);

    assert!(started.elapsed() >= std::time::Duration::from_millis(900));
    assert_eq!(
        sink.snapshot().delivery_success,
        vec![("alpha".to_owned(), false)]
    );
}
