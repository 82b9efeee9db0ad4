//! Scoped release of an open store.

use std::ops::{Deref, DerefMut};

use crate::storage::{Store, StoreError};

/// Owns an open store and closes it exactly once.
///
/// Dropping the guard closes the store (failures are logged). `release`
/// closes it and reports the failure instead. `suspend` hands the store back
/// without closing it; wrap it again with [`StoreGuard::new`] to reinstate.
#[derive(Debug)]
pub struct StoreGuard<S: Store> {
    // `None` only inside the consuming methods; a live guard always holds a store.
    store: Option<S>,
}

impl<S: Store> StoreGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store: Some(store) }
    }

    /// Disarm the guard and take the open store.
    pub fn suspend(mut self) -> S {
        match self.store.take() {
            Some(store) => store,
            None => unreachable!("store guard is always armed while alive"),
        }
    }

    /// Close the store now.
    pub fn release(mut self) -> Result<(), StoreError> {
        match self.store.take() {
            Some(mut store) => store.shutdown(),
            None => Ok(()),
        }
    }
}

impl<S: Store> Deref for StoreGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        match &self.store {
            Some(store) => store,
            None => unreachable!("store guard is always armed while alive"),
        }
    }
}

impl<S: Store> DerefMut for StoreGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        match &mut self.store {
            Some(store) => store,
            None => unreachable!("store guard is always armed while alive"),
        }
    }
}

impl<S: Store> Drop for StoreGuard<S> {
    fn drop(&mut self) {
        if let Some(mut store) = self.store.take() {
            if let Err(e) = store.shutdown() {
                tracing::warn!(
                    path = %store.location().display(),
                    error = %e,
                    "Failed to close store"
                );
            }
        }
    }
}
