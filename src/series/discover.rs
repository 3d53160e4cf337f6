//! Input file discovery
//!
//! Host-side glue: turns an input path into the ordered file list the
//! selector works on.

use super::{SeriesError, SeriesResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// List the CSV files to replay
///
/// A directory yields its `*.csv` entries (extension matched
/// case-insensitively, subdirectories ignored) sorted by file name. A file
/// path yields just that file.
pub fn discover_csv_files<P: AsRef<Path>>(path: P) -> SeriesResult<Vec<PathBuf>> {
    let path = path.as_ref();
    let discovery_error = |reason: String| SeriesError::Discovery {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|e| discovery_error(e.to_string()))?;
    if metadata.is_file() {
        debug!(path = %path.display(), "Input is a single file");
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = std::fs::read_dir(path).map_err(|e| discovery_error(e.to_string()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| discovery_error(e.to_string()))?;
        let candidate = entry.path();
        if candidate.is_file() && is_csv(&candidate) {
            files.push(candidate);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    info!(path = %path.display(), files = files.len(), "Discovered input files");
    Ok(files)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}
