//! Directory-backed store.
//!
//! Layout under `<data-dir>/DB`:
//! - `SCHEMA`: the schema version as decimal text
//! - `data.json`: a flat string map, rewritten atomically on flush
//!
//! A directory can be open at most once per process; a second `open` fails
//! with [`StoreError::Locked`] until the first handle is shut down or dropped.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use dashmap::DashSet;

use crate::storage::{DatabaseConfig, SchemaStamp, Store, StoreError};

const SCHEMA_FILE: &str = "SCHEMA";
const DATA_FILE: &str = "data.json";

/// Canonical directories of every store currently open.
fn open_dirs() -> &'static DashSet<PathBuf> {
    static OPEN_DIRS: OnceLock<DashSet<PathBuf>> = OnceLock::new();
    OPEN_DIRS.get_or_init(DashSet::new)
}

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    lock_key: PathBuf,
    entries: BTreeMap<String, String>,
    schema: SchemaStamp,
    /// The data file exists but could not be parsed.
    corrupt: bool,
    dirty: bool,
    open: bool,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_schema(path: &Path) -> Result<SchemaStamp, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(match text.trim().parse::<u32>() {
            Ok(version) => SchemaStamp::Recorded(version),
            Err(e) => SchemaStamp::Unreadable(e.to_string()),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(SchemaStamp::Missing),
        Err(e) => Err(io_err(path)(e)),
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(io_err(path)(e)),
    }
}

impl FileStore {
    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }

        let path = self.dir.join(DATA_FILE);
        let tmp = self.dir.join(format!("{DATA_FILE}.tmp"));
        let rendered = serde_json::to_string(&self.entries).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        fs::write(&tmp, rendered).map_err(io_err(&tmp))?;
        fs::rename(&tmp, &path).map_err(io_err(&path))?;
        self.dirty = false;
        Ok(())
    }

    fn unlock(&mut self) {
        if self.open {
            self.open = false;
            open_dirs().remove(&self.lock_key);
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }
}

impl Store for FileStore {
    fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let dir = config.store_dir();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        let lock_key = fs::canonicalize(&dir).map_err(io_err(&dir))?;

        let schema = read_schema(&dir.join(SCHEMA_FILE))?;
        // An unreadable data file on a stamped store is reported as such so
        // the schema gate can decide to rebuild instead of failing outright.
        let (entries, schema, corrupt) = match read_entries(&dir.join(DATA_FILE)) {
            Ok(entries) => (entries, schema, false),
            Err(StoreError::Corrupt { reason, .. }) => {
                tracing::warn!(path = %dir.display(), %reason, "Store data is corrupt");
                (BTreeMap::new(), SchemaStamp::Unreadable(reason), true)
            }
            Err(e) => return Err(e),
        };

        if !open_dirs().insert(lock_key.clone()) {
            return Err(StoreError::Locked { path: dir });
        }
        tracing::debug!(
            path = %dir.display(),
            entries = entries.len(),
            max_open_files = config.max_open_files,
            background_threads = config.background_threads,
            "Store opened"
        );

        Ok(Self {
            dir,
            lock_key,
            entries,
            schema,
            corrupt,
            dirty: false,
            open: true,
        })
    }

    fn shutdown(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let result = self.flush();
        self.unlock();
        tracing::debug!(path = %self.dir.display(), "Store closed");
        result
    }

    fn destroy(config: &DatabaseConfig) -> Result<(), StoreError> {
        let dir = config.store_dir();
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&dir)(e)),
        }
    }

    fn location(&self) -> &Path {
        &self.dir
    }

    fn schema_version(&self) -> SchemaStamp {
        self.schema.clone()
    }

    fn set_schema_version(&mut self, version: u32) -> Result<(), StoreError> {
        self.ensure_open()?;
        let path = self.dir.join(SCHEMA_FILE);
        fs::write(&path, format!("{version}\n")).map_err(io_err(&path))?;
        self.schema = SchemaStamp::Recorded(version);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty() && !self.corrupt
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.entries.insert(key.to_string(), value);
        self.dirty = true;
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        self.unlock();
    }
}
