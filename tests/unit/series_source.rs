//! Unit tests for the series source seam

use crate::common::{announce, update, RecordingSink};
use series_replay::replay::{DelayPolicy, ReplayEngine};
use series_replay::series::{
    self, OpenSeries, SeriesError, SeriesHeader, SeriesResult, SeriesRow, SeriesSource,
};
use series_replay::shutdown::StopHandle;
use series_replay::Scalar;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Rows held in memory, one numeric column `v`
#[derive(Default)]
struct MemorySource {
    files: HashMap<PathBuf, Vec<(&'static str, f64)>>,
}

impl MemorySource {
    fn with(mut self, file: &str, rows: Vec<(&'static str, f64)>) -> Self {
        self.files.insert(PathBuf::from(file), rows);
        self
    }
}

impl SeriesSource for MemorySource {
    fn open(&self, file: &Path) -> SeriesResult<OpenSeries> {
        let rows = self.files.get(file).cloned().ok_or_else(|| SeriesError::Read {
            path: file.to_path_buf(),
            reason: "no such file".to_string(),
        })?;
        let rows = rows.into_iter().map(|(key, value)| {
            Ok::<_, SeriesError>(SeriesRow {
                key: key.to_string(),
                cells: vec![Some(Scalar::Number(value))],
            })
        });
        Ok(OpenSeries {
            file: file.to_path_buf(),
            header: SeriesHeader {
                key_column: "time".to_string(),
                columns: vec!["v".to_string()],
            },
            rows: Box::new(rows),
        })
    }
}

fn source() -> MemorySource {
    MemorySource::default()
        .with(
            "a",
            vec![
                ("2024-01-01 00:00:00", 1.0),
                ("2024-01-01 00:00:10", 2.0),
                ("2024-01-01 00:00:20", 3.0),
            ],
        )
        .with("b", vec![("2024-01-01 00:00:30", 4.0)])
}

#[test]
fn test_published_rows_counts() {
    let source = source();
    let a = Path::new("a");

    assert_eq!(series::published_rows(&source, a, "2024-01-01 00:00:00").unwrap(), 1);
    assert_eq!(series::published_rows(&source, a, "2024-01-01 00:00:20").unwrap(), 3);
    // Between rows: everything at or before the instant
    assert_eq!(series::published_rows(&source, a, "2024-01-01 00:00:15").unwrap(), 2);
    // Before the first row
    assert_eq!(series::published_rows(&source, a, "2023-12-31 00:00:00").unwrap(), 0);
    // Not a timestamp and no match
    assert_eq!(series::published_rows(&source, a, "row-7").unwrap(), 0);
}

#[test]
fn test_unreadable_file_surfaces_error() {
    let files = vec![PathBuf::from("missing")];
    assert!(matches!(
        series::select(&files, None, &source()),
        Err(SeriesError::Read { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_engine_runs_over_any_source() {
    let source = source();
    let files = vec![PathBuf::from("a"), PathBuf::from("b")];
    let selection = series::select(&files, None, &source).unwrap();

    let sink = Arc::new(RecordingSink::new());
    let mut engine = ReplayEngine::new(DelayPolicy::unclamped(), sink.clone(), StopHandle::shared());
    let summary = engine.run(selection, &source).await.unwrap();

    assert_eq!(
        sink.events(),
        vec![
            announce("v", 1.0),
            update("v", 2.0),
            update("v", 3.0),
            update("v", 4.0),
        ]
    );
    assert_eq!(summary.files_completed, 2);
}
