//! Blockchain checkpoints.
//!
//! A checkpoint pins the block hash expected at a height. They come from a
//! built-in table or from a CSV file of `height,hash` lines.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

const BUILT_IN: &[(u64, &str)] = &[
    (
        10_000,
        "3e5f1d6c0a4b98e2f1c7d0b3a6e4f2c9815d7a0e3b6c9f2a5d8e1b4c7f0a3d6e",
    ),
    (
        50_000,
        "a1c4e7f0b3d6a9c2e5f8b1d4a7c0e3f6b9d2a5c8e1f4b7d0a3c6e9f2b5d8a1c4",
    ),
    (
        100_000,
        "0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0",
    ),
];

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("cannot read checkpoint file: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("line {line}: duplicate checkpoint for height {height}")]
    Duplicate { line: usize, height: u64 },
}

/// Where checkpoints come from, decoded from `--load-checkpoints`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointSource {
    Disabled,
    BuiltIn,
    File(PathBuf),
}

impl CheckpointSource {
    pub fn from_setting(value: &str) -> Self {
        match value.trim() {
            "" => Self::Disabled,
            "default" => Self::BuiltIn,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoints {
    points: BTreeMap<u64, [u8; 32]>,
}

impl Checkpoints {
    pub fn load(source: &CheckpointSource) -> Result<Self, CheckpointError> {
        match source {
            CheckpointSource::Disabled => Ok(Self::default()),
            CheckpointSource::BuiltIn => {
                let mut checkpoints = Self::default();
                for (index, (height, hash)) in BUILT_IN.iter().enumerate() {
                    checkpoints.add(index + 1, *height, hash)?;
                }
                Ok(checkpoints)
            }
            CheckpointSource::File(path) => Self::load_file(path),
        }
    }

    fn load_file(path: &Path) -> Result<Self, CheckpointError> {
        let text = fs::read_to_string(path)?;
        let mut checkpoints = Self::default();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let raw = raw.trim();
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }

            let (height, hash) = raw.split_once(',').ok_or_else(|| CheckpointError::Malformed {
                line,
                reason: "expected <height>,<hash>".to_string(),
            })?;
            let height = height
                .trim()
                .parse::<u64>()
                .map_err(|e| CheckpointError::Malformed {
                    line,
                    reason: format!("bad height: {e}"),
                })?;
            checkpoints.add(line, height, hash.trim())?;
        }

        tracing::info!(
            path = %path.display(),
            count = checkpoints.len(),
            "Loaded checkpoints"
        );
        Ok(checkpoints)
    }

    fn add(&mut self, line: usize, height: u64, hash: &str) -> Result<(), CheckpointError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hash, &mut bytes).map_err(|e| CheckpointError::Malformed {
            line,
            reason: format!("bad hash: {e}"),
        })?;

        if self.points.insert(height, bytes).is_some() {
            return Err(CheckpointError::Duplicate { line, height });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Highest checkpointed height, if any.
    pub fn top_height(&self) -> Option<u64> {
        self.points.keys().next_back().copied()
    }
}
