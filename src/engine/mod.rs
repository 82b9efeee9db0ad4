//! Chain engine façade.
//!
//! # Data Flow
//! ```text
//! provisioned StoreGuard ──▶ ChainEngine::new (exclusive owner)
//! checkpoints            ──▶ ChainEngine::new
//!                            load()          reads persisted top height
//!                            ... running ...
//!                            save()          persist engine state
//!                            release_store() close the store exactly once
//! ```
//!
//! # Design Decisions
//! - Block and transaction validation live elsewhere; this type only owns
//!   the state the node lifecycle has to load, persist and release
//! - Height is an atomic so RPC and console threads read it without locking

pub mod checkpoints;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::storage::{FileStore, Store, StoreError, StoreGuard};

pub use checkpoints::{CheckpointError, CheckpointSource, Checkpoints};

const TOP_HEIGHT_KEY: &str = "top-height";

pub struct ChainEngine {
    store: Mutex<Option<StoreGuard<FileStore>>>,
    checkpoints: Checkpoints,
    height: AtomicU64,
}

impl ChainEngine {
    pub fn new(store: StoreGuard<FileStore>, checkpoints: Checkpoints) -> Self {
        Self {
            store: Mutex::new(Some(store)),
            checkpoints,
            height: AtomicU64::new(0),
        }
    }

    fn store(&self) -> MutexGuard<'_, Option<StoreGuard<FileStore>>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read persisted state from the store.
    pub fn load(&self) -> Result<(), StoreError> {
        let store = self.store();
        let store = store.as_ref().ok_or(StoreError::Closed)?;

        let height = match store.get(TOP_HEIGHT_KEY) {
            Some(raw) => raw.parse::<u64>().map_err(|e| StoreError::Corrupt {
                path: store.location().to_path_buf(),
                reason: format!("{TOP_HEIGHT_KEY}: {e}"),
            })?,
            None => 0,
        };
        self.height.store(height, Ordering::Release);

        tracing::info!(
            height,
            checkpoints = self.checkpoints.len(),
            "Blockchain state loaded"
        );
        Ok(())
    }

    /// Write engine state back to the store.
    pub fn save(&self) -> Result<(), StoreError> {
        let mut store = self.store();
        let store = store.as_mut().ok_or(StoreError::Closed)?;
        store.put(TOP_HEIGHT_KEY, self.height().to_string())?;
        tracing::debug!(height = self.height(), "Blockchain state saved");
        Ok(())
    }

    /// Close the store. Later calls are no-ops.
    pub fn release_store(&self) -> Result<(), StoreError> {
        match self.store().take() {
            Some(guard) => guard.release(),
            None => Ok(()),
        }
    }

    pub fn height(&self) -> u64 {
        self.height.load(Ordering::Acquire)
    }

    pub fn checkpoints(&self) -> &Checkpoints {
        &self.checkpoints
    }

    #[cfg(test)]
    pub(crate) fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::Release);
    }
}

impl std::fmt::Debug for ChainEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainEngine")
            .field("height", &self.height())
            .field("checkpoints", &self.checkpoints.len())
            .finish()
    }
}
