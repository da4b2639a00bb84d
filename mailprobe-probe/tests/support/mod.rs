//! Recording test doubles for the probe engine's collaborators.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use mailprobe_common::traits::{MailSender, MetricsSink};

/// A `MailSender` that records every message instead of talking to a relay.
#[derive(Debug, Default)]
pub struct RecordingSender {
    messages: Mutex<Vec<Vec<u8>>>,
    fail: bool,
}

impl RecordingSender {
    /// A sender whose every submission fails, as if the relay were down.
    pub const fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.messages.lock().unwrap().clone()
    }

    /// Wait until the first message has been handed over and return it.
    pub async fn first_payload(&self) -> Vec<u8> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(message) = self.messages.lock().unwrap().first().cloned() {
                    return message;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("no probe mail was sent")
    }
}

#[async_trait]
impl MailSender for RecordingSender {
    async fn send(&self, message: &[u8]) -> anyhow::Result<()> {
        self.messages.lock().unwrap().push(message.to_vec());

        if self.fail {
            anyhow::bail!("relay unreachable");
        }
        Ok(())
    }
}

/// Everything a probe cycle reported, in call order per instrument.
#[derive(Debug, Clone, Default)]
pub struct Observations {
    pub registered: Vec<String>,
    pub delivery_success: Vec<(String, bool)>,
    pub last_deliver_times: Vec<(String, f64)>,
    pub last_deliver_durations: Vec<(String, f64)>,
    pub observed_durations: Vec<(String, f64)>,
    pub late_mails: Vec<String>,
}

/// A `MetricsSink` that records observations for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    observations: Mutex<Observations>,
}

impl RecordingSink {
    pub fn snapshot(&self) -> Observations {
        self.observations.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingSink {
    fn register_target(&self, target: &str) {
        self.observations
            .lock()
            .unwrap()
            .registered
            .push(target.to_owned());
    }

    fn set_delivery_success(&self, target: &str, delivered: bool) {
        self.observations
            .lock()
            .unwrap()
            .delivery_success
            .push((target.to_owned(), delivered));
    }

    fn set_last_deliver_time(&self, target: &str, unix_seconds: f64) {
        self.observations
            .lock()
            .unwrap()
            .last_deliver_times
            .push((target.to_owned(), unix_seconds));
    }

    fn set_last_deliver_duration(&self, target: &str, millis: f64) {
        self.observations
            .lock()
            .unwrap()
            .last_deliver_durations
            .push((target.to_owned(), millis));
    }

    fn observe_deliver_duration(&self, target: &str, millis: f64) {
        self.observations
            .lock()
            .unwrap()
            .observed_durations
            .push((target.to_owned(), millis));
    }

    fn inc_late_mail(&self, target: &str) {
        self.observations
            .lock()
            .unwrap()
            .late_mails
            .push(target.to_owned());
    }
}
