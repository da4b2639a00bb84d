//! The shared arrival dispatcher.
//!
//! One detector serves every target: it consumes creation events from all
//! watched delivery locations, parses new files, and hands each decodable
//! arrival to the prober owning the target name found in its payload.

use ahash::AHashMap;
use notify::{
    Event, EventKind,
    event::{ModifyKind, RenameMode},
};
use tokio::sync::mpsc;

use mailprobe_common::{incoming, internal};

use crate::mail;
use crate::types::DetectedMail;
use crate::watcher::MailWatcher;

/// Buffer depth of each target's delivery channel.
///
/// A depth of a few slots lets a prober that is sleeping between cycles
/// absorb the usual one-arrival-per-interval without stalling the shared
/// detector. A full channel still blocks the dispatch loop — and with it
/// detection for *all* targets — until the owning prober drains it; mail is
/// never dropped on the floor.
pub const DELIVERY_QUEUE_DEPTH: usize = 4;

/// Routing table from target name to that target's delivery channel.
///
/// Built once before the detector starts and never mutated afterwards.
pub type Routes = AHashMap<String, mpsc::Sender<DetectedMail>>;

/// The single shared detection worker.
pub struct Detector {
    watcher: MailWatcher,
    routes: Routes,
}

impl Detector {
    /// Wire a detector over an already-registered watcher and a complete
    /// routing table.
    #[must_use]
    pub const fn new(watcher: MailWatcher, routes: Routes) -> Self {
        Self { watcher, routes }
    }

    /// Dispatch arrivals until the watcher stream ends (process lifetime,
    /// in practice). Watcher-level errors are logged and the loop carries
    /// on watching.
    pub async fn run(mut self) {
        internal!(level = INFO, "started mail detection");

        while let Some(event) = self.watcher.next().await {
            match event {
                Ok(event) => self.handle_event(&event).await,
                Err(err) => internal!(level = WARN, "watcher error: {err}"),
            }
        }
    }

    /// Process one filesystem event: for every created file, attempt to
    /// parse it as a probe mail and route it. Files that do not decode are
    /// not ours and are skipped without a sound.
    pub async fn handle_event(&self, event: &Event) {
        if !is_creation(&event.kind) {
            return;
        }

        for path in &event.paths {
            match mail::parse_detected(path).await {
                Ok(mail) => self.route(mail).await,
                Err(err) => {
                    incoming!(level = TRACE, "skipping {}: {err}", path.display());
                }
            }
        }
    }

    async fn route(&self, mail: DetectedMail) {
        let Some(channel) = self.routes.get(&mail.name) else {
            // A decodable payload naming an unknown target means the
            // routing table and the config disagree; worth a warning
            incoming!(
                level = WARN,
                "discarding probe mail for unregistered target {:?}",
                mail.name
            );
            return;
        };

        incoming!(level = DEBUG, "probe mail for {:?} detected", mail.name);

        if channel.send(mail).await.is_err() {
            incoming!(level = WARN, "delivery channel closed; probe mail dropped");
        }
    }
}

/// Mail shows up in a delivery location either as a fresh file or, for
/// maildir-style delivery, renamed in from a staging directory; both count
/// as an arrival.
const fn is_creation(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use notify::event::CreateKind;

    use mailprobe_common::payload::{Payload, Token};

    use super::*;

    fn created(path: &std::path::Path) -> Event {
        Event::new(EventKind::Create(CreateKind::File)).add_path(path.to_owned())
    }

    fn write_delivered(dir: &tempfile::TempDir, name: &str, body: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut content = b"Received: by relay.example.com\r\n\r\n".to_vec();
        content.extend_from_slice(body);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn detector_with_route(target: &str) -> (Detector, mpsc::Receiver<DetectedMail>) {
        let (tx, rx) = mpsc::channel(DELIVERY_QUEUE_DEPTH);
        let mut routes = Routes::new();
        routes.insert(target.to_owned(), tx);

        (
            Detector::new(MailWatcher::new().unwrap(), routes),
            rx,
        )
    }

    #[tokio::test]
    async fn routes_probe_mail_to_its_target() {
        let dir = tempfile::tempdir().unwrap();
        let (detector, mut rx) = detector_with_route("alpha");

        let payload = Payload::new("alpha".into(), Token::generate(), 7);
        let path = write_delivered(&dir, "probe.eml", &payload.encode());

        detector.handle_event(&created(&path)).await;

        let mail = rx.try_recv().unwrap();
        assert_eq!(mail.name, "alpha");
        assert_eq!(mail.token, payload.token);
        assert_eq!(mail.sent_nanos, 7);
    }

    #[tokio::test]
    async fn discards_mail_for_unregistered_targets() {
        let dir = tempfile::tempdir().unwrap();
        let (detector, mut rx) = detector_with_route("alpha");

        let payload = Payload::new("beta".into(), Token::generate(), 7);
        let path = write_delivered(&dir, "probe.eml", &payload.encode());

        detector.handle_event(&created(&path)).await;

        assert!(rx.try_recv().is_err());
        // Discarded, not deleted
        assert!(path.exists());
    }

    #[tokio::test]
    async fn ignores_foreign_files_and_leaves_them_alone() {
        let dir = tempfile::tempdir().unwrap();
        let (detector, mut rx) = detector_with_route("alpha");

        let path = dir.path().join("note.txt");
        std::fs::write(&path, b"hello").unwrap();

        detector.handle_event(&created(&path)).await;

        assert!(rx.try_recv().is_err());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn ignores_non_creation_events() {
        let dir = tempfile::tempdir().unwrap();
        let (detector, mut rx) = detector_with_route("alpha");

        let payload = Payload::new("alpha".into(), Token::generate(), 7);
        let path = write_delivered(&dir, "probe.eml", &payload.encode());

        let event = Event::new(EventKind::Modify(ModifyKind::Data(
            notify::event::DataChange::Any,
        )))
        .add_path(path);
        detector.handle_event(&event).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn end_to_end_detection_through_the_watcher() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(DELIVERY_QUEUE_DEPTH);
        let mut routes = Routes::new();
        routes.insert("alpha".to_owned(), tx);

        let mut watcher = MailWatcher::new().unwrap();
        watcher.watch(dir.path()).unwrap();

        let detector = Detector::new(watcher, routes);
        let task = tokio::spawn(detector.run());

        // Deliver the maildir way: write elsewhere, rename in, so the event
        // always carries a complete file
        let staging = tempfile::tempdir().unwrap();
        let payload = Payload::new("alpha".into(), Token::generate(), 7);
        let staged = write_delivered(&staging, "probe.eml", &payload.encode());
        std::fs::rename(&staged, dir.path().join("probe.eml")).unwrap();

        let mail = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("detection timed out")
            .expect("channel closed");
        assert_eq!(mail.token, payload.token);

        task.abort();
    }
}
