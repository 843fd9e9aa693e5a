//! Single-slot latest-result store
//!
//! One pretty-printed JSON file at a well-known cache path holds the
//! complete result of the most recent run, so follow-up requests (export,
//! claim evaluation) can consume it without re-running the traversal.
//! Writes go to a uniquely named temp file and are renamed into place, so
//! concurrent runs resolve to last-writer-wins without torn files.

use crate::models::TraversalResult;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// File name of the persisted slot inside the cache folder.
pub const LATEST_RESULT_FILE: &str = "latest_result.json";

/// Result store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Result store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Result store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Process-wide single-slot store of the most recent completed result.
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(cache_folder: &Path) -> Self {
        Self {
            path: cache_folder.join(LATEST_RESULT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the slot atomically (temp file + rename).
    pub fn commit(&self, result: &TraversalResult) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(result)?;

        let tmp = self
            .path
            .with_file_name(format!("{LATEST_RESULT_FILE}.{}.tmp", Uuid::new_v4()));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Latest result committed");
        Ok(())
    }

    /// Fetch the latest result; `None` when the slot is empty.
    pub fn fetch_latest(&self) -> Result<Option<TraversalResult>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Clear the slot; clearing an already-empty slot is a no-op.
    pub fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            tracing::debug!(path = %self.path.display(), "Latest result cleared");
        }
        Ok(())
    }
}
