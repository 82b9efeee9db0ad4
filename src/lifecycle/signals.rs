//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers while the node is running
//! - Turn the first delivered signal into exactly one stop request
//!
//! # Design Decisions
//! - The handler only stores into an atomic (`signal_hook::flag`); no
//!   logging or allocation happens in signal context
//! - A plain thread watches the flag and calls `request_stop`
//! - Handlers are unregistered during shutdown, before anything else stops

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::{flag, low_level, SigId};

use crate::error::StartupError;
use crate::lifecycle::shutdown::{Shutdown, StopCause};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Installed signal handlers plus the thread that forwards them.
pub struct SignalBridge {
    ids: Vec<SigId>,
    closed: Arc<AtomicBool>,
    watcher: Option<JoinHandle<()>>,
}

impl SignalBridge {
    pub fn install(shutdown: Shutdown) -> Result<Self, StartupError> {
        let pending = Arc::new(AtomicBool::new(false));
        let mut ids = Vec::with_capacity(2);
        for signal in [SIGINT, SIGTERM] {
            match flag::register(signal, Arc::clone(&pending)) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    for id in ids {
                        low_level::unregister(id);
                    }
                    return Err(StartupError::Signals(e));
                }
            }
        }

        let closed = Arc::new(AtomicBool::new(false));
        let watcher = {
            let closed = Arc::clone(&closed);
            std::thread::Builder::new()
                .name("signals".into())
                .spawn(move || {
                    while !closed.load(Ordering::Acquire) {
                        if pending.swap(false, Ordering::AcqRel) {
                            tracing::info!("Termination signal received");
                            shutdown.request_stop(StopCause::Signal);
                            break;
                        }
                        std::thread::sleep(POLL_INTERVAL);
                    }
                })
        };

        let watcher = match watcher {
            Ok(handle) => handle,
            Err(e) => {
                for id in ids {
                    low_level::unregister(id);
                }
                return Err(StartupError::Thread("signals", e));
            }
        };

        tracing::debug!("Signal handlers installed");
        Ok(Self {
            ids,
            closed,
            watcher: Some(watcher),
        })
    }

    /// Unregister the handlers and join the watcher thread.
    pub fn uninstall(&mut self) {
        for id in self.ids.drain(..) {
            low_level::unregister(id);
        }
        self.closed.store(true, Ordering::Release);
        if let Some(handle) = self.watcher.take() {
            if handle.join().is_err() {
                tracing::warn!("Signal watcher thread panicked");
            }
        }
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        self.uninstall();
    }
}
