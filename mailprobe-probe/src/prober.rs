//! The per-target probe cycle.
//!
//! Each prober loops for the process lifetime: compose a payload, hand it
//! to the mail transport, then sit in the seek loop until its own token
//! comes back through the detector or the check timeout elapses, report the
//! outcome, sleep, repeat.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time;

use mailprobe_common::{
    config::{TargetConfig, Timings},
    incoming, internal, outgoing,
    payload::{Payload, Token},
    traits::{MailSender, MetricsSink},
};

use crate::types::{DetectedMail, ProbeOutcome};

/// One target's probe worker.
///
/// Owns the receiving end of the target's delivery channel; arrivals are
/// consumed in the order the detector routed them. Matched artifacts are
/// deleted from disk; late ones are counted and left where they are, so a
/// long-running process accumulates whatever never matched (external
/// cleanup's problem, deliberately).
pub struct Prober {
    target: TargetConfig,
    timings: Timings,
    sender: Arc<dyn MailSender>,
    sink: Arc<dyn MetricsSink>,
    deliveries: mpsc::Receiver<DetectedMail>,
}

impl Prober {
    #[must_use]
    pub fn new(
        target: TargetConfig,
        timings: Timings,
        sender: Arc<dyn MailSender>,
        sink: Arc<dyn MetricsSink>,
        deliveries: mpsc::Receiver<DetectedMail>,
    ) -> Self {
        Self {
            target,
            timings,
            sender,
            sink,
            deliveries,
        }
    }

    /// Probe every monitoring interval, forever.
    pub async fn run(mut self) {
        internal!(
            level = INFO,
            "started monitoring for target {:?}",
            self.target.name
        );

        loop {
            self.probe().await;
            time::sleep(self.timings.monitoring_interval()).await;
        }
    }

    /// Run one full probe cycle: send, then seek until the attempt's token
    /// arrives or the check timeout ends the wait.
    pub async fn probe(&mut self) -> ProbeOutcome {
        let payload = Payload::compose(&self.target.name);
        let token = payload.token.clone();

        if let Err(err) = self.sender.send(&payload.encode()).await {
            // A probe that never left is indistinguishable from one that
            // was sent and lost; both must surface as the coming timeout
            outgoing!(
                level = WARN,
                "failed to send probe mail for {:?}: {err:#}",
                self.target.name
            );
        }

        let deadline = time::sleep(self.timings.mail_check_timeout());
        tokio::pin!(deadline);

        // The seek loop: a non-matching arrival must not end the cycle, or
        // one late mail would mask the mail actually being awaited
        loop {
            tokio::select! {
                mail = self.deliveries.recv() => match mail {
                    Some(mail) => {
                        if let Some(outcome) = self.inspect(mail, &token).await {
                            break outcome;
                        }
                    }
                    None => {
                        internal!(
                            level = WARN,
                            "delivery channel for {:?} closed",
                            self.target.name
                        );
                        deadline.as_mut().await;
                        self.sink.set_delivery_success(&self.target.name, false);
                        break ProbeOutcome::TimedOut;
                    }
                },
                () = &mut deadline => {
                    self.sink.set_delivery_success(&self.target.name, false);
                    break ProbeOutcome::TimedOut;
                }
            }
        }
    }

    /// Classify one arrival; `Some` ends the seek loop.
    #[allow(
        clippy::cast_precision_loss,
        reason = "timestamps fit f64 for metric purposes"
    )]
    async fn inspect(&self, mail: DetectedMail, awaited: &Token) -> Option<ProbeOutcome> {
        let name = &self.target.name;

        // Last-seen observations update before any token check: stray mail
        // still tells an operator when this path last moved anything
        let deliver_time = mail.received_nanos as f64 / 1e9;
        let duration_millis = (mail.received_nanos - mail.sent_nanos) as f64 / 1e6;
        self.sink.set_last_deliver_time(name, deliver_time);
        self.sink.set_last_deliver_duration(name, duration_millis);
        self.sink.observe_deliver_duration(name, duration_millis);

        if mail.token == *awaited {
            self.sink.set_delivery_success(name, true);
            delete_artifact(&mail.path).await;
            return Some(ProbeOutcome::Matched);
        }

        // A leftover from an earlier cycle (or a race); its artifact is not
        // ours to delete
        incoming!(level = DEBUG, "late probe mail for {name:?}");
        self.sink.inc_late_mail(name);
        None
    }
}

/// Remove a matched probe mail so artifacts do not pile up in the delivery
/// location. Failure is logged and otherwise ignored.
async fn delete_artifact(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        internal!(
            level = WARN,
            "failed to remove probe mail {}: {err}",
            path.display()
        );
    }
}
