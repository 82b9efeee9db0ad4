//! Persistent store subsystem.
//!
//! # Data Flow
//! ```text
//! DaemonConfig
//!     → DatabaseConfig (location + tuning knobs)
//!     → provision.rs (data dir policy, schema gate, rebuild)
//!     → StoreGuard<FileStore> handed to the engine
//!     → released exactly once during shutdown
//! ```
//!
//! # Design Decisions
//! - The engine never reads a store whose schema version differs from ours
//! - Release is tied to the guard, so every exit path closes the handle
//! - Store internals stay behind the `Store` trait

pub mod file_store;
pub mod guard;
pub mod provision;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{default_data_dir, DaemonConfig};

pub use file_store::FileStore;
pub use guard::StoreGuard;
pub use provision::{ensure_schema, open_store, prepare_data_dir, Provisioned, SCHEMA_VERSION};

/// Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt store data in {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("store is closed")]
    Closed,

    #[error("store at {path} is already open in this process")]
    Locked { path: PathBuf },
}

/// What the store says about its own schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStamp {
    /// No version was ever written.
    Missing,
    Recorded(u32),
    /// Metadata exists but cannot be parsed.
    Unreadable(String),
}

/// Location and tuning of the blockchain database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub data_dir: PathBuf,

    /// The data directory came from the built-in default, so it may be created.
    pub config_folder_defaulted: bool,

    pub max_open_files: u32,
    pub read_buffer_size_mb: u32,
    pub write_buffer_size_mb: u32,
    pub background_threads: u32,
}

impl DatabaseConfig {
    pub fn from_daemon(config: &DaemonConfig) -> Self {
        Self {
            config_folder_defaulted: config.data_dir == default_data_dir(),
            data_dir: config.data_dir.clone(),
            max_open_files: config.db_max_open_files,
            read_buffer_size_mb: config.db_read_buffer_size,
            write_buffer_size_mb: config.db_write_buffer_size,
            background_threads: config.db_threads,
        }
    }

    /// Directory holding the store files.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("DB")
    }
}

/// A persistent key/value store with a schema version stamp.
pub trait Store: Send + Sized {
    /// Open (creating if needed) the store described by `config`.
    fn open(config: &DatabaseConfig) -> Result<Self, StoreError>;

    /// Flush and close. Further writes fail with [`StoreError::Closed`].
    fn shutdown(&mut self) -> Result<(), StoreError>;

    /// Erase every persisted byte of the store. The store must be closed.
    fn destroy(config: &DatabaseConfig) -> Result<(), StoreError>;

    fn location(&self) -> &Path;

    fn schema_version(&self) -> SchemaStamp;

    fn set_schema_version(&mut self, version: u32) -> Result<(), StoreError>;

    /// True when no data entries exist.
    fn is_empty(&self) -> bool;

    fn get(&self, key: &str) -> Option<String>;

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_dir_is_flagged() {
        let config = DatabaseConfig::from_daemon(&DaemonConfig::default());
        assert!(config.config_folder_defaulted);
        assert_eq!(config.store_dir(), default_data_dir().join("DB"));
    }

    #[test]
    fn test_explicit_data_dir_is_not_defaulted() {
        let daemon = DaemonConfig {
            data_dir: PathBuf::from("/srv/chain"),
            db_threads: 8,
            ..Default::default()
        };
        let config = DatabaseConfig::from_daemon(&daemon);
        assert!(!config.config_folder_defaulted);
        assert_eq!(config.background_threads, 8);
    }
}
