//! Resume-aware selection of the files still to replay

use super::{SeriesError, SeriesResult, SeriesSource};
use crate::resume::Checkpoint;
use crate::timestamp;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The files left to replay and where to start in the first one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    files: Vec<PathBuf>,
    checkpoint: Checkpoint,
    resume_after: Option<String>,
}

impl Selection {
    /// Files to replay, in order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Starting checkpoint (seeded when there was no prior progress)
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Row key in the first file that was already published, if resuming
    ///
    /// Replay of the first file starts strictly after this row.
    pub fn resume_after(&self) -> Option<&str> {
        self.resume_after.as_deref()
    }

    /// Consume the selection into its parts
    pub fn into_parts(self) -> (Vec<PathBuf>, Checkpoint, Option<String>) {
        (self.files, self.checkpoint, self.resume_after)
    }
}

/// Determine the ordered files still to replay
///
/// With no checkpoint the whole input set is selected and a checkpoint is
/// seeded at the first row of the first file. Otherwise the selection is the
/// suffix of `available` starting at the checkpointed file.
///
/// # Errors
/// - [`SeriesError::EmptyInputSet`] when `available` is empty
/// - [`SeriesError::CheckpointFileNotFound`] when the checkpointed file is gone
pub fn select<S: SeriesSource + ?Sized>(
    available: &[PathBuf],
    checkpoint: Option<Checkpoint>,
    source: &S,
) -> SeriesResult<Selection> {
    let first = available.first().ok_or(SeriesError::EmptyInputSet)?;

    let Some(checkpoint) = checkpoint else {
        let row_key = source.first_row_key(first)?;
        info!(
            file = %first.display(),
            row_key = row_key.as_deref().unwrap_or("<none>"),
            files = available.len(),
            "No prior progress, replaying the whole input set"
        );
        return Ok(Selection {
            files: available.to_vec(),
            checkpoint: Checkpoint::new(first.clone(), row_key),
            resume_after: None,
        });
    };

    let index = available
        .iter()
        .position(|file| file.as_path() == checkpoint.file())
        .ok_or_else(|| SeriesError::CheckpointFileNotFound(checkpoint.file().to_path_buf()))?;

    let resume_after = checkpoint.row_key().map(str::to_string);
    info!(
        file = %checkpoint.file().display(),
        row_key = resume_after.as_deref().unwrap_or("<none>"),
        skipped_files = index,
        remaining_files = available.len() - index,
        "Resuming from checkpoint"
    );

    Ok(Selection {
        files: available[index..].to_vec(),
        checkpoint,
        resume_after,
    })
}

/// Number of leading rows of `file` already published up to `row_key`
///
/// The first row whose key equals `row_key` marks the boundary. Without an
/// exact match, rows at or before the checkpoint instant count as published.
/// A checkpoint key that is not a timestamp and matches no row publishes
/// nothing: the file is replayed from its first row.
pub fn published_rows<S: SeriesSource + ?Sized>(
    source: &S,
    file: &Path,
    row_key: &str,
) -> SeriesResult<usize> {
    let checkpoint_instant = timestamp::parse(row_key).ok();
    let mut series = source.open(file)?;
    let mut at_or_before = 0usize;

    for (index, row) in series.rows.by_ref().enumerate() {
        let row = row?;
        if row.key == row_key {
            debug!(file = %file.display(), skipped = index + 1, "Checkpoint row found");
            return Ok(index + 1);
        }

        if let Some(limit) = checkpoint_instant {
            match timestamp::parse(&row.key) {
                Ok(instant) if instant <= limit => at_or_before = index + 1,
                // Rows are in timestamp order: nothing later can match
                _ => break,
            }
        }
    }

    if checkpoint_instant.is_some() {
        debug!(
            file = %file.display(),
            skipped = at_or_before,
            "Checkpoint row not found, skipping rows up to its instant"
        );
        Ok(at_or_before)
    } else {
        warn!(
            file = %file.display(),
            row_key = %row_key,
            "Checkpoint row key is not a timestamp and matches no row, replaying file from the start"
        );
        Ok(0)
    }
}
