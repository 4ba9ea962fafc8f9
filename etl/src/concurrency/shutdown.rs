//! Shutdown signalling for pipeline runs.
//!
//! Wraps a tokio watch channel carrying a single flag. Once the flag is raised it stays raised,
//! so receivers created after the signal was sent still observe it.

use std::sync::Arc;

use tokio::sync::watch;

/// Receiver side of the shutdown signal.
pub type ShutdownRx = watch::Receiver<bool>;

/// Transmitter side of the shutdown signal.
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct ShutdownTx(Arc<watch::Sender<bool>>);

impl ShutdownTx {
    /// Raises the shutdown flag for every current and future receiver.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    /// Returns `true` once [`ShutdownTx::shutdown`] has been called.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Creates a new receiver observing this signal.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Creates a new shutdown channel with the flag lowered.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(Arc::new(tx)), rx)
}

/// Returns `true` when shutdown was requested on the channel `rx` belongs to.
pub fn is_shutdown_requested(rx: &ShutdownRx) -> bool {
    *rx.borrow()
}
