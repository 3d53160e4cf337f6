//! CSV series reader
//!
//! Streams rows out of a recorded CSV file. The header fixes the column
//! layout; a record whose field count differs from the header is a malformed
//! row and ends the stream with an error.

use super::{SeriesError, SeriesResult, SeriesSource};
use crate::Scalar;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Column layout of one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesHeader {
    /// Name of the row key column (first column)
    pub key_column: String,
    /// Variable column names, in declared order
    pub columns: Vec<String>,
}

impl SeriesHeader {
    /// Position of a variable column, if this file has it
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// One row of an input file
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRow {
    /// Row key (timestamp string)
    pub key: String,
    /// Cell values aligned with [`SeriesHeader::columns`]; `None` for empty cells
    pub cells: Vec<Option<Scalar>>,
}

/// Boxed row stream
pub type SeriesRows = Box<dyn Iterator<Item = SeriesResult<SeriesRow>> + Send>;

/// An opened input file
pub struct OpenSeries {
    /// File identifier
    pub file: PathBuf,
    /// Column layout
    pub header: SeriesHeader,
    /// Rows in file order
    pub rows: SeriesRows,
}

impl std::fmt::Debug for OpenSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSeries")
            .field("file", &self.file)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

/// Reads series rows from CSV files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSeriesReader;

impl SeriesSource for CsvSeriesReader {
    fn open(&self, file: &Path) -> SeriesResult<OpenSeries> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_path(file)
            .map_err(|e| SeriesError::Read {
                path: file.to_path_buf(),
                reason: e.to_string(),
            })?;

        let headers = reader.headers().map_err(|e| to_series_error(file, e))?.clone();
        let mut names = headers.iter().map(|h| h.trim().to_string());
        let key_column = names.next().unwrap_or_default();
        let columns: Vec<String> = names.collect();

        debug!(
            file = %file.display(),
            key_column = %key_column,
            columns = columns.len(),
            "Opened series file"
        );

        let rows = CsvRows {
            file: file.to_path_buf(),
            records: reader.into_records(),
            failed: false,
        };

        Ok(OpenSeries {
            file: file.to_path_buf(),
            header: SeriesHeader {
                key_column,
                columns,
            },
            rows: Box::new(rows),
        })
    }
}

struct CsvRows {
    file: PathBuf,
    records: StringRecordsIntoIter<File>,
    failed: bool,
}

impl Iterator for CsvRows {
    type Item = SeriesResult<SeriesRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.records.next()? {
            Ok(record) => Some(Ok(to_row(&record))),
            Err(e) => {
                // A malformed row is terminal for the file
                self.failed = true;
                Some(Err(to_series_error(&self.file, e)))
            }
        }
    }
}

fn to_row(record: &StringRecord) -> SeriesRow {
    let mut fields = record.iter();
    let key = fields.next().unwrap_or_default().to_string();
    let cells = fields.map(Scalar::from_cell).collect();
    SeriesRow { key, cells }
}

fn to_series_error(file: &Path, error: csv::Error) -> SeriesError {
    let line = error.position().map(|p| p.line()).unwrap_or(0);
    match error.into_kind() {
        csv::ErrorKind::Io(e) => SeriesError::Read {
            path: file.to_path_buf(),
            reason: e.to_string(),
        },
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => SeriesError::MalformedRow {
            path: file.to_path_buf(),
            line,
            reason: format!("expected {expected_len} fields, found {len}"),
        },
        other => SeriesError::MalformedRow {
            path: file.to_path_buf(),
            line,
            reason: format!("{other:?}"),
        },
    }
}
