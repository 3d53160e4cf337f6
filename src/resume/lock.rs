//! Single-instance guard for a checkpoint path
//!
//! Two replayers sharing one checkpoint would overwrite each other's progress
//! on stop. The host holds an exclusive advisory lock (fd-lock) on a sibling
//! `.run.lock` file for the whole run. This is a different file from the
//! `.lock` used around individual saves, so holding it never blocks `save`.

use super::state::CheckpointError;
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Run lock wrapper for a checkpoint path
pub struct ReplayLock {
    lock: RwLock<File>,
    path: PathBuf,
}

impl ReplayLock {
    /// Open (creating if needed) the run lock file for `checkpoint_path`
    pub fn open(checkpoint_path: &Path) -> Result<Self, CheckpointError> {
        if let Some(parent) = checkpoint_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CheckpointError::Persistence {
                    path: checkpoint_path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            }
        }

        let path = checkpoint_path.with_extension("run.lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| CheckpointError::Lock(format!("Failed to open run lock file: {e}")))?;

        Ok(Self {
            lock: RwLock::new(file),
            path,
        })
    }

    /// Lock file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to take the exclusive run lock without blocking
    ///
    /// The lock is held until the returned guard is dropped. The owning
    /// process id is written into the lock file for diagnostics.
    pub fn try_acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>, CheckpointError> {
        let path = self.path.clone();
        let mut guard = self.lock.try_write().map_err(|e| {
            CheckpointError::Lock(format!(
                "Another replay is already using {}: {e}",
                path.display()
            ))
        })?;

        record_owner(&mut guard)
            .map_err(|e| CheckpointError::Lock(format!("Failed to record lock owner: {e}")))?;

        Ok(guard)
    }
}

fn record_owner(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()
}
