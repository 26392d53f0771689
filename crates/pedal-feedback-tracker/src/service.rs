//! Tracker service running on a dedicated tokio task
//!
//! The service owns a [`PedalTracker`] and is the only place its state is
//! touched, so no locking is needed. Raw keys arrive over an mpsc channel,
//! highlight expiries are served by sleeping until the tracker's next
//! deadline, and every change is published on a `watch` channel.
//!
//! ```text
//! +-------------+      +--------+      +------------------+      +-------+
//! | key source  | ---> | mpsc   | ---> | TrackerService   | ---> | watch | ---> renderers
//! | (evdev/...) |      | channel|      | (event loop task)|      |       |
//! +-------------+      +--------+      +------------------+      +-------+
//!                                         ^ sleep_until(next expiry)
//! ```
//!
//! The returned [`TrackerHandle`] controls the lifecycle: input sources
//! attached to it are aborted on [`TrackerHandle::dispose`], and all pending
//! expiries are cancelled with the loop. Dropping the handle without
//! disposing aborts everything as well.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::error::TrackerError;
use crate::tracker::{PedalTracker, Snapshot, TrackerOptions};

/// Default number of raw keys buffered between a source and the tracker
pub const DEFAULT_KEY_BUFFER: usize = 64;

/// Cloneable sender that feeds raw keys into a running tracker.
#[derive(Debug, Clone)]
pub struct KeySender {
    sender: mpsc::Sender<String>,
}

impl KeySender {
    /// Queue a raw key-down for the tracker.
    ///
    /// Fails with [`TrackerError::Disposed`] once the tracker has stopped.
    pub async fn send(&self, raw_key: impl Into<String>) -> Result<(), TrackerError> {
        self.sender
            .send(raw_key.into())
            .await
            .map_err(|_| TrackerError::Disposed)
    }

    /// True once the tracker has stopped accepting keys.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Wait until the tracker stops accepting keys.
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

/// Event loop state for one tracker
pub struct TrackerService {
    tracker: PedalTracker,
    keys: mpsc::Receiver<String>,
    snapshots: watch::Sender<Snapshot>,
    shutdown: oneshot::Receiver<()>,
}

impl TrackerService {
    /// Spawn a tracker with the default key buffer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(options: TrackerOptions) -> TrackerHandle {
        Self::spawn_with_buffer(options, DEFAULT_KEY_BUFFER)
    }

    /// Spawn a tracker whose key channel buffers up to `buffer_size` keys.
    pub fn spawn_with_buffer(options: TrackerOptions, buffer_size: usize) -> TrackerHandle {
        let (key_tx, key_rx) = mpsc::channel(buffer_size);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!(
            "Starting tracker: {} key(s), highlight {}ms, history limit {}",
            options.key_config.len(),
            options.highlight_duration.as_millis(),
            options.history_limit
        );

        let service = TrackerService {
            tracker: PedalTracker::new(options),
            keys: key_rx,
            snapshots: snapshot_tx,
            shutdown: shutdown_rx,
        };

        let task = tokio::spawn(service.run());

        TrackerHandle {
            keys: KeySender { sender: key_tx },
            snapshots: snapshot_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
            sources: Vec::new(),
        }
    }

    /// Process keys and expiries until shut down.
    ///
    /// Returns the final snapshot, taken after all highlights were cleared.
    async fn run(self) -> Snapshot {
        let TrackerService {
            mut tracker,
            mut keys,
            snapshots,
            mut shutdown,
        } = self;

        loop {
            let deadline = tracker.next_deadline();

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    debug!("Tracker shutdown requested");
                    break;
                }

                key = keys.recv() => match key {
                    Some(raw_key) => {
                        if tracker.handle_key_down(&raw_key, Instant::now()).is_some() {
                            snapshots.send_replace(tracker.snapshot());
                        }
                    }
                    None => {
                        debug!("All key senders dropped, stopping tracker");
                        break;
                    }
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if tracker.expire_due(Instant::now()) {
                        snapshots.send_replace(tracker.snapshot());
                    }
                }
            }
        }

        // Pending expiries die with the loop; clear what they would have cleared
        tracker.clear_highlights();
        let snapshot = tracker.snapshot();
        snapshots.send_replace(snapshot.clone());
        snapshot
    }
}

/// Owner of a running tracker.
pub struct TrackerHandle {
    keys: KeySender,
    snapshots: watch::Receiver<Snapshot>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Snapshot>>,
    sources: Vec<AbortHandle>,
}

impl TrackerHandle {
    /// A sender for input sources to push raw keys through.
    pub fn key_sender(&self) -> KeySender {
        self.keys.clone()
    }

    /// Queue a raw key-down.
    pub async fn send_key(&self, raw_key: impl Into<String>) -> Result<(), TrackerError> {
        self.keys.send(raw_key).await
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Tie an input source task to this tracker; it is aborted on disposal.
    pub fn attach_source<T>(&mut self, source: &JoinHandle<T>) {
        self.sources.push(source.abort_handle());
    }

    /// Stop the tracker: detach input sources, cancel pending expiries and
    /// wait for the event loop to finish.
    ///
    /// Returns the final snapshot (history intact, no active highlights).
    pub async fn dispose(mut self) -> Snapshot {
        for source in self.sources.drain(..) {
            source.abort();
        }

        if let Some(shutdown) = self.shutdown.take() {
            // The loop may already have stopped on its own
            let _ = shutdown.send(());
        }

        let snapshot = match self.task.take() {
            Some(task) => match task.await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Tracker task ended abnormally: {}", e);
                    self.snapshots.borrow().clone()
                }
            },
            None => self.snapshots.borrow().clone(),
        };

        info!("Tracker disposed ({} history item(s))", snapshot.history.len());

        snapshot
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        for source in self.sources.drain(..) {
            source.abort();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
