//! Wallet container file handling.
//!
//! The service only needs to know that a container exists and how it was
//! created. Key material is managed elsewhere and never written here.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::schema::WalletModes;
use crate::error::StartupError;

const CONTAINER_FORMAT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreationMode {
    New,
    ImportedKeys,
    ImportedSeed,
}

impl CreationMode {
    pub fn from_modes(modes: &WalletModes) -> Self {
        if modes.has_seed() {
            CreationMode::ImportedSeed
        } else if modes.has_keys() {
            CreationMode::ImportedKeys
        } else {
            CreationMode::New
        }
    }
}

/// On-disk container record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainerRecord {
    pub format: u32,
    pub created_at: u64,
    pub creation: CreationMode,
    pub scan_height: u64,
}

/// Fail unless the container file exists.
pub fn check_container_exists(path: &Path) -> Result<(), StartupError> {
    if path.is_file() {
        return Ok(());
    }

    let mut message = format!("A wallet with the filename {} doesn't exist!", path.display());
    let suggestion = with_suffix(path, ".wallet");
    if suggestion.is_file() {
        message.push_str(&format!(" Did you mean: {}?", suggestion.display()));
    } else {
        message.push_str(" Ensure you entered your wallet name correctly, or use --generate-container to create a new one.");
    }
    Err(StartupError::Container(message))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), StartupError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| StartupError::Container(format!("cannot create {}: {e}", path.display())))?;
    file.write_all(contents)
        .and_then(|_| file.write_all(b"\n"))
        .and_then(|_| file.sync_all())
        .map_err(|e| StartupError::Container(format!("cannot write {}: {e}", path.display())))
}

/// Create a new container. Refuses to overwrite an existing file.
pub fn generate_container(path: &Path, modes: &WalletModes) -> Result<ContainerRecord, StartupError> {
    let record = ContainerRecord {
        format: CONTAINER_FORMAT,
        created_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
        creation: CreationMode::from_modes(modes),
        scan_height: modes.scan_height,
    };

    let rendered = serde_json::to_string_pretty(&record)
        .map_err(|e| StartupError::Container(e.to_string()))?;

    // Written beside the target and linked into place, so a failed write
    // never leaves a truncated container and an existing one is never replaced.
    let tmp = with_suffix(path, ".tmp");
    let published = write_file(&tmp, rendered.as_bytes()).and_then(|_| {
        fs::hard_link(&tmp, path).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => StartupError::Container(format!(
                "{} already exists, refusing to overwrite it",
                path.display()
            )),
            _ => StartupError::Container(format!("cannot create {}: {e}", path.display())),
        })
    });
    let _ = fs::remove_file(&tmp);
    published?;

    tracing::info!(
        path = %path.display(),
        creation = ?record.creation,
        scan_height = record.scan_height,
        "Wallet container created"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_container_suggests_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.wallet"), "{}").unwrap();

        let err = check_container_exists(&dir.path().join("main")).unwrap_err();
        assert!(err.to_string().contains("Did you mean"));

        let err = check_container_exists(&dir.path().join("other")).unwrap_err();
        assert!(err.to_string().contains("--generate-container"));
    }

    #[test]
    fn test_generate_records_mode_without_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.wallet");
        let modes = WalletModes {
            generate_container: true,
            view_key: Some("aa".repeat(32)),
            spend_key: Some("bb".repeat(32)),
            scan_height: 500,
            ..Default::default()
        };

        let record = generate_container(&path, &modes).unwrap();
        assert_eq!(record.creation, CreationMode::ImportedKeys);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains(&"aa".repeat(32)));
        let parsed: ContainerRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.scan_height, 500);
        check_container_exists(&path).unwrap();
    }

    #[test]
    fn test_generate_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.wallet");
        std::fs::write(&path, "keep me").unwrap();

        assert!(generate_container(&path, &WalletModes::default()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
        assert!(!dir.path().join("taken.wallet.tmp").exists());
    }

    #[test]
    fn test_failed_write_leaves_no_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("half.wallet");
        // The staging path is occupied by a directory, so the write fails.
        std::fs::create_dir(dir.path().join("half.wallet.tmp")).unwrap();

        let err = generate_container(&path, &WalletModes::default()).unwrap_err();
        assert!(err.to_string().contains("cannot create"));
        assert!(!path.exists());
        assert!(check_container_exists(&path).is_err());
    }
}
