//! Shutdown coordination.

use std::sync::Arc;

use tokio::sync::watch;

/// One-shot coordinator for graceful shutdown.
///
/// Any number of tasks can subscribe; a listener created after the trigger
/// still observes it. Dropping every `Shutdown` handle also releases the
/// listeners, so tasks never outlive their coordinator.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Returns `false` if it was already triggered.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|triggered| {
            if *triggered {
                false
            } else {
                *triggered = true;
                true
            }
        })
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Wait for the trigger (or for every coordinator handle to be dropped).
    ///
    /// Cancel safe; completes immediately once triggered.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }

    /// Consume the listener, waiting for the trigger.
    pub async fn wait(mut self) {
        self.recv().await;
    }
}
