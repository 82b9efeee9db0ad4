//! Stop coordination for the node.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

/// Who asked the node to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    Signal,
    Console,
    /// Programmatic request through a [`Shutdown`] handle.
    Requested,
    /// The run loop failed.
    Fault,
}

#[derive(Debug)]
struct Inner {
    requested: AtomicBool,
    cause: OnceLock<StopCause>,
    tx: watch::Sender<bool>,
}

/// Cloneable stop handle.
///
/// Any holder can request a stop; the first request wins and later ones are
/// no-ops. Async tasks wait on it, threads poll `is_requested`.
#[derive(Debug, Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                requested: AtomicBool::new(false),
                cause: OnceLock::new(),
                tx,
            }),
        }
    }

    /// Request a stop. Returns `true` only for the call that won.
    pub fn request_stop(&self, cause: StopCause) -> bool {
        if self
            .inner
            .requested
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!(?cause, "Stop already requested");
            return false;
        }

        let _ = self.inner.cause.set(cause);
        self.inner.tx.send_replace(true);
        tracing::info!(?cause, "Stop requested");
        true
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Cause recorded by the winning request.
    pub fn cause(&self) -> Option<StopCause> {
        self.inner.cause.get().copied()
    }

    /// Resolve once a stop has been requested.
    pub async fn wait(&self) {
        let mut rx = self.inner.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
