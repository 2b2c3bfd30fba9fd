//! Process-wide cancellation signal.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable one-shot cancellation signal.
///
/// Every clone observes the same flag.  Once triggered it stays triggered,
/// and every pending [`Shutdown::wait`] resolves.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Raise the signal.  Safe to call from a non-async context such as a
    /// signal handler, and more than once.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal has been raised.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone of `self`, so this cannot
        // observe a closed channel before the flag flips.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
