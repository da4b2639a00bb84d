//! Filesystem-notification capability, bridged onto the async side.

use std::path::Path;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::WatchError;

/// Raw events buffered between notify's thread and the detector task.
const EVENT_QUEUE_DEPTH: usize = 1024;

/// Creation events for every watched delivery location, as one lazy,
/// infinite sequence. Watcher-level errors travel the same stream so the
/// consumer can log them without the stream ending.
pub struct MailWatcher {
    watcher: RecommendedWatcher,
    events: mpsc::Receiver<notify::Result<Event>>,
}

impl MailWatcher {
    /// Create the watcher. No paths are watched until [`Self::watch`].
    ///
    /// # Errors
    ///
    /// Returns an error if the platform notification backend cannot be set
    /// up; this is fatal at startup.
    pub fn new() -> Result<Self, WatchError> {
        let (tx, events) = mpsc::channel(EVENT_QUEUE_DEPTH);

        let watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            // Runs on notify's own thread; a full queue blocks there rather
            // than dropping events
            let _ = tx.blocking_send(event);
        })?;

        Ok(Self { watcher, events })
    }

    /// Register one delivery location. All registrations must complete
    /// before consumption starts, or an early arrival races its route.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be watched; fatal at startup.
    pub fn watch(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher.watch(path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    /// The next filesystem event or watcher-level error.
    pub async fn next(&mut self) -> Option<notify::Result<Event>> {
        self.events.recv().await
    }
}

impl std::fmt::Debug for MailWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailWatcher").finish_non_exhaustive()
    }
}
