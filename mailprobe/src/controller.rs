//! Wiring and lifecycle: one detector, one prober per target.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time;

use mailprobe_common::{
    config::{TargetConfig, Timings, validate_targets},
    internal, logging,
    traits::MetricsSink,
};
use mailprobe_metrics::{MetricsConfig, ProbeMetrics};
use mailprobe_probe::{DELIVERY_QUEUE_DEPTH, Detector, MailWatcher, Prober, detector::Routes};
use mailprobe_smtp::SmtpSender;

/// The deserialized top-level configuration, and the controller that runs
/// everything it describes.
#[derive(Debug, Deserialize)]
pub struct Mailprobe {
    #[serde(default)]
    timings: Timings,

    #[serde(default)]
    metrics: MetricsConfig,

    #[serde(rename = "target")]
    targets: Vec<TargetConfig>,
}

impl Mailprobe {
    /// Validate, wire, and run until the process is told to stop.
    ///
    /// Startup failures (invalid target list, watcher setup, metrics
    /// export setup) are fatal; nothing inside the steady-state probe loops
    /// is.
    ///
    /// # Errors
    ///
    /// Any startup failure described above.
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();

        validate_targets(&self.targets)?;
        mailprobe_metrics::init(&self.metrics)?;

        let sink: Arc<dyn MetricsSink> = Arc::new(ProbeMetrics::new());
        for target in &self.targets {
            sink.register_target(&target.name);
        }

        // Every watch registration and every route must exist before the
        // detector starts, or an early arrival would find no channel
        let mut watcher = MailWatcher::new()?;
        let mut routes = Routes::new();
        let mut inboxes = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            watcher.watch(&target.detection_dir)?;

            let (deliveries, inbox) = mpsc::channel(DELIVERY_QUEUE_DEPTH);
            routes.insert(target.name.clone(), deliveries);
            inboxes.push(inbox);
        }

        tokio::spawn(Detector::new(watcher, routes).run());

        for (target, inbox) in self.targets.into_iter().zip(inboxes) {
            let sender = Arc::new(SmtpSender::new(target.clone()));
            let prober = Prober::new(target, self.timings.clone(), sender, sink.clone(), inbox);
            tokio::spawn(prober.run());

            // Keep a delta between the probe workers so targets do not
            // burst their mail in lockstep
            time::sleep(self.timings.startup_offset()).await;
        }

        shutdown().await
    }
}

/// Resolve once the process is asked to stop.
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "interrupt received, shutting down");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "terminate signal received, shutting down");
        }
    }

    Ok(())
}
