//! Configuration loading from and saving to disk.
//!
//! Files are JSON unless the extension is `.toml`. Keys mirror the command
//! line flag names; unknown keys are ignored and missing keys fall through to
//! the lower tier.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ConfigError;

/// On-disk encodings understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => FileFormat::Toml,
            _ => FileFormat::Json,
        }
    }
}

/// Load the file tier of a configuration.
///
/// Either the whole file is accepted or an error is returned; a partially
/// parsed file never leaks into resolution.
pub fn load_overrides<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::FileUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let malformed = |reason: String| ConfigError::FileMalformed {
        path: path.to_path_buf(),
        reason,
    };

    match FileFormat::from_path(path) {
        FileFormat::Toml => toml::from_str(&content).map_err(|e| malformed(e.to_string())),
        FileFormat::Json => serde_json::from_str(&content).map_err(|e| malformed(e.to_string())),
    }
}

/// Render a configuration as indented JSON for `--dump-config`.
pub fn dump_config<T: Serialize>(config: &T) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(config).map_err(|e| ConfigError::FileMalformed {
        path: "<stdout>".into(),
        reason: e.to_string(),
    })
}

/// Write a configuration for `--save-config`, in the format the path implies.
pub fn save_config<T: Serialize>(config: &T, path: &Path) -> Result<(), ConfigError> {
    let unwritable = |reason: String| ConfigError::FileUnwritable {
        path: path.to_path_buf(),
        reason,
    };

    let mut rendered = match FileFormat::from_path(path) {
        FileFormat::Toml => toml::to_string_pretty(config).map_err(|e| unwritable(e.to_string()))?,
        FileFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| unwritable(e.to_string()))?
        }
    };
    rendered.push('\n');

    fs::write(path, rendered).map_err(|e| unwritable(e.to_string()))
}
