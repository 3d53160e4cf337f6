//! Checkpoint type for resume capability

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The last published position of a replay: input file plus row key.
///
/// `row_key` is `None` when the file was selected but no row of it has been
/// consumed yet (e.g. a freshly seeded checkpoint over an empty file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    row_key: Option<String>,
}

impl Checkpoint {
    /// Create a checkpoint at a row of a file
    pub fn new(file: impl Into<PathBuf>, row_key: Option<String>) -> Self {
        Self {
            file: file.into(),
            row_key,
        }
    }

    /// Create a checkpoint pointing at a specific row key
    pub fn at_row(file: impl Into<PathBuf>, row_key: impl Into<String>) -> Self {
        Self::new(file, Some(row_key.into()))
    }

    /// Input file identifier
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Key of the last consumed row, if any
    pub fn row_key(&self) -> Option<&str> {
        self.row_key.as_deref()
    }

    /// Record that `row_key` of `file` has been consumed
    pub fn advance(&mut self, file: &Path, row_key: &str) {
        if self.file != file {
            self.file = file.to_path_buf();
        }
        self.row_key = Some(row_key.to_string());
    }
}
