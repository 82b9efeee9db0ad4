//! Data directory policy and schema-gated store provisioning.
//!
//! # Responsibilities
//! - Create a defaulted data directory, require an explicit one to exist
//! - Compare the recorded schema version with the one this build expects
//! - Destroy and recreate the store when they differ
//!
//! # Design Decisions
//! - A fresh, empty, unversioned store is stamped, not rebuilt
//! - The rebuild owns the handle while it works and returns a new guard

use std::fs;

use crate::error::{DirectoryError, SchemaError};
use crate::observability::metrics;
use crate::storage::{DatabaseConfig, SchemaStamp, Store, StoreGuard};

/// Schema version of the data this build writes.
pub const SCHEMA_VERSION: u32 = 1;

/// Result of [`ensure_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// The store already matched (or was freshly stamped).
    Ready,
    /// The store was erased and recreated empty.
    Rebuilt,
}

/// Apply the data directory policy.
pub fn prepare_data_dir(config: &DatabaseConfig) -> Result<(), DirectoryError> {
    let dir = &config.data_dir;
    if config.config_folder_defaulted {
        fs::create_dir_all(dir).map_err(|source| DirectoryError::Uncreatable {
            path: dir.clone(),
            source,
        })?;
        tracing::debug!(path = %dir.display(), "Using default data directory");
    } else if !dir.is_dir() {
        return Err(DirectoryError::Missing(dir.clone()));
    }
    Ok(())
}

/// Open the store and put it under a guard.
pub fn open_store<S: Store>(config: &DatabaseConfig) -> Result<StoreGuard<S>, SchemaError> {
    S::open(config)
        .map(StoreGuard::new)
        .map_err(|source| SchemaError::Unreadable {
            path: config.store_dir(),
            source,
        })
}

/// Make sure the store carries `expected`, rebuilding it if it does not.
pub fn ensure_schema<S: Store>(
    mut guard: StoreGuard<S>,
    config: &DatabaseConfig,
    expected: u32,
) -> Result<(Provisioned, StoreGuard<S>), SchemaError> {
    let stamp = guard.schema_version();

    match stamp {
        SchemaStamp::Recorded(found) if found == expected => {
            tracing::debug!(version = found, "Store schema is current");
            Ok((Provisioned::Ready, guard))
        }
        SchemaStamp::Missing if guard.is_empty() => {
            guard
                .set_schema_version(expected)
                .map_err(|source| SchemaError::RebuildFailed {
                    path: config.store_dir(),
                    source,
                })?;
            tracing::debug!(version = expected, "Stamped new store");
            Ok((Provisioned::Ready, guard))
        }
        other => {
            tracing::warn!(
                found = ?other,
                expected,
                path = %config.store_dir().display(),
                "Database schema version mismatch, rebuilding"
            );
            let guard = rebuild(guard.suspend(), config, expected)?;
            metrics::record_store_rebuild();
            Ok((Provisioned::Rebuilt, guard))
        }
    }
}

/// Close, erase and reopen the store, then stamp it.
fn rebuild<S: Store>(
    mut store: S,
    config: &DatabaseConfig,
    expected: u32,
) -> Result<StoreGuard<S>, SchemaError> {
    let failed = |source| SchemaError::RebuildFailed {
        path: config.store_dir(),
        source,
    };

    store.shutdown().map_err(failed)?;
    drop(store);
    S::destroy(config).map_err(failed)?;

    let mut guard = StoreGuard::new(S::open(config).map_err(failed)?);
    guard.set_schema_version(expected).map_err(failed)?;

    tracing::info!(version = expected, "Database rebuilt");
    Ok(guard)
}
