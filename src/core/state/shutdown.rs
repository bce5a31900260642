// src/core/state/shutdown.rs

//! The process-wide shutdown signal.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Idempotent shutdown trigger. The first `trigger` wins; later calls, including
/// concurrent ones from the shell and a signal handler, are no-ops.
#[derive(Debug)]
pub struct ShutdownSignal {
    requested: AtomicBool,
    tx: broadcast::Sender<()>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            requested: AtomicBool::new(false),
            tx,
        }
    }

    /// Returns true if this call initiated the shutdown.
    pub fn trigger(&self) -> bool {
        if self.requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        // Receivers that already went away have nothing left to stop.
        let _ = self.tx.send(());
        true
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Subscribes to the shutdown broadcast. Tasks must subscribe before they are
    /// spawned and check `is_requested` at their loop head.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Resolves once shutdown has been requested, even if that happened before the
    /// call.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        if self.is_requested() {
            return;
        }
        let _ = rx.recv().await;
    }
}
