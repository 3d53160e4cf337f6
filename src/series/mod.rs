//! Input series discovery, reading and selection
//!
//! A series is an ordered list of CSV files. Each file's first column is the
//! row key (`YYYY-MM-DD HH:MM:SS`); every other column is a variable.
//!
//! - [`discover`] - find the input files (host-side glue)
//! - [`reader`] - stream rows out of one file
//! - [`select`] - work out which files remain after a checkpoint

use std::path::{Path, PathBuf};

pub mod discover;
pub mod reader;
pub mod select;

pub use discover::discover_csv_files;
pub use reader::{CsvSeriesReader, OpenSeries, SeriesHeader, SeriesRow, SeriesRows};
pub use select::{published_rows, select, Selection};

/// Series errors
#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    /// No input files to replay
    #[error("no input files to replay")]
    EmptyInputSet,

    /// The checkpointed file is not part of the current input set
    #[error("checkpoint file {} is not in the input set (inputs rotated or deleted?)", .0.display())]
    CheckpointFileNotFound(PathBuf),

    /// Input discovery failed
    #[error("failed to discover input files in {}: {reason}", .path.display())]
    Discovery {
        /// Path being scanned
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Input file could not be read
    #[error("failed to read {}: {reason}", .path.display())]
    Read {
        /// Input file
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// A row that cannot be interpreted (hard failure)
    #[error("malformed row in {} (line {line}): {reason}", .path.display())]
    MalformedRow {
        /// Input file
        path: PathBuf,
        /// 1-based line number, 0 when unknown
        line: u64,
        /// What was wrong with it
        reason: String,
    },
}

/// Result type for series operations
pub type SeriesResult<T> = Result<T, SeriesError>;

/// Access to the rows of an input file
///
/// Implemented by [`CsvSeriesReader`]; a seam so selection and replay do not
/// care where rows come from.
pub trait SeriesSource: Send + Sync {
    /// Open a file and stream its rows in order
    fn open(&self, file: &Path) -> SeriesResult<OpenSeries>;

    /// Key of the first row, or `None` for a file without rows
    fn first_row_key(&self, file: &Path) -> SeriesResult<Option<String>> {
        let mut series = self.open(file)?;
        match series.rows.next() {
            Some(row) => Ok(Some(row?.key)),
            None => Ok(None),
        }
    }
}
