//! Checkpoint persistence
//!
//! Atomic file writes (temp file + rename) with advisory locking, and a
//! lenient loader: an absent or unreadable checkpoint is a fresh start, only
//! an unavailable storage medium is an error.

use super::checkpoint::Checkpoint;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current checkpoint schema version
const SCHEMA_VERSION: &str = "1.0.0";

/// Maximum allowed checkpoint file size (1 MB); anything larger is not ours
pub const MAX_CHECKPOINT_FILE_SIZE: u64 = 1024 * 1024;

/// On-disk checkpoint record
#[derive(Debug, Serialize, Deserialize)]
struct StoredCheckpoint {
    schema_version: String,
    #[serde(flatten)]
    checkpoint: Checkpoint,
    saved_at: i64,
}

/// Durable store for the replay checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store backed by the file at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Checkpoint file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn persistence_error(&self, reason: impl std::fmt::Display) -> CheckpointError {
        CheckpointError::Persistence {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn open_lock_file(&self) -> Result<File, CheckpointError> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(|e| CheckpointError::Lock(format!("Failed to open lock file: {e}")))
    }

    /// Load the checkpoint, if one has been written
    ///
    /// Returns `Ok(None)` when no checkpoint exists or its content cannot be
    /// interpreted. Fails only when the storage itself is unavailable.
    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        debug!(path = %self.path.display(), "Loading checkpoint");

        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No checkpoint found, starting fresh");
                return Ok(None);
            }
            Err(e) => return Err(self.persistence_error(e)),
        };

        if metadata.len() > MAX_CHECKPOINT_FILE_SIZE {
            warn!(
                path = %self.path.display(),
                size = metadata.len(),
                max = MAX_CHECKPOINT_FILE_SIZE,
                "Checkpoint file too large, ignoring it"
            );
            return Ok(None);
        }

        let lock = RwLock::new(self.open_lock_file()?);
        let _guard = lock
            .read()
            .map_err(|e| CheckpointError::Lock(format!("Failed to acquire read lock: {e}")))?;

        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), error = %e, "Checkpoint is not valid UTF-8, ignoring it");
                return Ok(None);
            }
            Err(e) => return Err(self.persistence_error(e)),
        };

        let stored: StoredCheckpoint = match serde_json::from_str(&contents) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to deserialize checkpoint, ignoring it");
                return Ok(None);
            }
        };

        if stored.schema_version != SCHEMA_VERSION {
            warn!(
                found_version = %stored.schema_version,
                expected_version = SCHEMA_VERSION,
                "Checkpoint schema version mismatch, ignoring it"
            );
            return Ok(None);
        }

        info!(
            file = %stored.checkpoint.file().display(),
            row_key = stored.checkpoint.row_key().unwrap_or("<none>"),
            saved_at = stored.saved_at,
            "Checkpoint loaded"
        );
        Ok(Some(stored.checkpoint))
    }

    /// Persist the checkpoint atomically
    ///
    /// Writes to a temp file in the target directory, syncs it, then renames
    /// it over the checkpoint so a crash never leaves a half-written record.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        debug!(
            path = %self.path.display(),
            file = %checkpoint.file().display(),
            row_key = checkpoint.row_key().unwrap_or("<none>"),
            "Saving checkpoint"
        );

        let parent_dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent_dir).map_err(|e| self.persistence_error(e))?;

        let stored = StoredCheckpoint {
            schema_version: SCHEMA_VERSION.to_string(),
            checkpoint: checkpoint.clone(),
            saved_at: chrono::Utc::now().timestamp_millis(),
        };
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;

        let mut lock = RwLock::new(self.open_lock_file()?);
        let _guard = lock
            .write()
            .map_err(|e| CheckpointError::Lock(format!("Failed to acquire write lock: {e}")))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| self.persistence_error(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| self.persistence_error(format!("Failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| self.persistence_error(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| self.persistence_error(format!("Failed to sync temp file: {e}")))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| self.persistence_error(format!("Failed to persist temp file: {e}")))?;

        // Make the rename itself durable
        if let Ok(dir) = File::open(parent_dir) {
            let _ = dir.sync_all();
        }

        info!(
            path = %self.path.display(),
            file = %checkpoint.file().display(),
            row_key = checkpoint.row_key().unwrap_or("<none>"),
            "Checkpoint saved"
        );
        Ok(())
    }

    /// Remove the checkpoint so the next run starts from the beginning
    pub fn clear(&self) -> Result<(), CheckpointError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Checkpoint removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.persistence_error(e)),
        }
    }
}

/// Errors related to checkpoint persistence
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Storage unavailable or write failed
    #[error("checkpoint persistence error at {}: {reason}", .path.display())]
    Persistence {
        /// Checkpoint path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Lock error
    #[error("lock error: {0}")]
    Lock(String),
}
