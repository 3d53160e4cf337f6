//! Integration tests for resume capability

use crate::common::{announce, update, write_csv, RecordingSink};
use series_replay::replay::{DelayPolicy, ReplayEngine, StopReason};
use series_replay::resume::{Checkpoint, CheckpointStore, ReplayLock};
use series_replay::series::{self, CsvSeriesReader, SeriesError};
use series_replay::shutdown::StopHandle;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_checkpoint_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path().join("checkpoint.json"));

    for checkpoint in [
        Checkpoint::at_row("data/2024-01.csv", "2024-01-31 23:59:59"),
        Checkpoint::at_row("b.csv", "2024-01-01 00:00:50"),
        Checkpoint::new("empty.csv", None),
    ] {
        store.save(&checkpoint).unwrap();
        assert_eq!(store.load().unwrap(), Some(checkpoint));
    }
}

#[test]
fn test_checkpoint_json_shape() {
    let checkpoint = Checkpoint::at_row("a.csv", "2024-01-01 00:00:40");
    let json = serde_json::to_string(&checkpoint).unwrap();
    assert_eq!(json, r#"{"file":"a.csv","row_key":"2024-01-01 00:00:40"}"#);

    let unstarted: Checkpoint = serde_json::from_str(r#"{"file":"a.csv"}"#).unwrap();
    assert_eq!(unstarted.row_key(), None);
}

#[tokio::test(start_paused = true)]
async fn test_stopped_run_resumes_after_last_published_row() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    std::fs::create_dir(&input).unwrap();
    write_csv(
        &input,
        "a.csv",
        "time,x\n\
         2024-01-01 00:00:00,1\n\
         2024-01-01 00:00:30,2\n\
         2024-01-01 00:01:00,3\n",
    );
    write_csv(&input, "b.csv", "time,x\n2024-01-01 00:01:30,4\n");
    let files = series::discover_csv_files(&input).unwrap();
    let store = CheckpointStore::new(dir.path().join("state/checkpoint.json"));

    // First run: stop while waiting for the third row
    let selection = series::select(&files, store.load().unwrap(), &CsvSeriesReader).unwrap();
    let first_sink = Arc::new(RecordingSink::new());
    let stop = StopHandle::shared();
    let mut engine = ReplayEngine::new(DelayPolicy::default(), first_sink.clone(), stop.clone())
        .with_checkpoint_store(store.clone());
    let run = tokio::spawn(async move { engine.run(selection, &CsvSeriesReader).await });
    tokio::time::sleep(Duration::from_secs(45)).await;
    stop.request_stop();
    let first = run.await.unwrap().unwrap();

    assert_eq!(first.reason, StopReason::Requested);
    assert_eq!(first_sink.events(), vec![announce("x", 1.0), update("x", 2.0)]);
    assert_eq!(
        store.load().unwrap(),
        Some(Checkpoint::at_row(&files[0], "2024-01-01 00:00:30"))
    );

    // Second run picks up at the third row
    let selection = series::select(&files, store.load().unwrap(), &CsvSeriesReader).unwrap();
    assert_eq!(selection.resume_after(), Some("2024-01-01 00:00:30"));
    let second_sink = Arc::new(RecordingSink::new());
    let mut engine = ReplayEngine::new(
        DelayPolicy::default(),
        second_sink.clone(),
        StopHandle::shared(),
    )
    .with_checkpoint_store(store.clone());
    let second = engine.run(selection, &CsvSeriesReader).await.unwrap();

    assert_eq!(second.reason, StopReason::Exhausted);
    assert_eq!(second_sink.events(), vec![announce("x", 3.0), update("x", 4.0)]);
    assert_eq!(
        store.load().unwrap(),
        Some(Checkpoint::at_row(&files[1], "2024-01-01 00:01:30"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_resume_from_later_file_skips_earlier_ones() {
    let dir = TempDir::new().unwrap();
    let a = write_csv(dir.path(), "a.csv", "time,x\n2024-01-01 00:00:00,1\n");
    let b = write_csv(
        dir.path(),
        "b.csv",
        "time,x\n\
         2024-01-01 00:00:30,2\n\
         2024-01-01 00:01:00,3\n",
    );
    let files = vec![a, b.clone()];

    let checkpoint = Checkpoint::at_row(&b, "2024-01-01 00:00:30");
    let selection = series::select(&files, Some(checkpoint), &CsvSeriesReader).unwrap();
    assert_eq!(selection.files(), &[b.clone()]);

    let sink = Arc::new(RecordingSink::new());
    let mut engine = ReplayEngine::new(DelayPolicy::default(), sink.clone(), StopHandle::shared());
    let summary = engine.run(selection, &CsvSeriesReader).await.unwrap();

    assert_eq!(sink.events(), vec![announce("x", 3.0)]);
    assert_eq!(summary.checkpoint, Checkpoint::at_row(&b, "2024-01-01 00:01:00"));
}

#[tokio::test(start_paused = true)]
async fn test_resume_without_exact_row_match_uses_instant() {
    let dir = TempDir::new().unwrap();
    let file = write_csv(
        dir.path(),
        "a.csv",
        "time,x\n\
         2024-01-01 00:00:00,1\n\
         2024-01-01 00:00:30,2\n\
         2024-01-01 00:01:00,3\n",
    );

    // Row key from a previous revision of the file
    let checkpoint = Checkpoint::at_row(&file, "2024-01-01 00:00:45");
    let selection = series::select(&[file], Some(checkpoint), &CsvSeriesReader).unwrap();

    let sink = Arc::new(RecordingSink::new());
    let mut engine = ReplayEngine::new(DelayPolicy::default(), sink.clone(), StopHandle::shared());
    engine.run(selection, &CsvSeriesReader).await.unwrap();

    assert_eq!(sink.events(), vec![announce("x", 3.0)]);
}

#[test]
fn test_checkpoint_for_vanished_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let file = write_csv(dir.path(), "a.csv", "time,x\n2024-01-01 00:00:00,1\n");

    let checkpoint = Checkpoint::at_row(dir.path().join("rotated.csv"), "2024-01-01 00:00:00");
    let err = series::select(&[file], Some(checkpoint), &CsvSeriesReader).unwrap_err();
    assert!(matches!(err, SeriesError::CheckpointFileNotFound(_)));
}

#[test]
fn test_second_replayer_cannot_share_checkpoint() {
    let dir = TempDir::new().unwrap();
    let checkpoint = dir.path().join("checkpoint.json");

    let mut first = ReplayLock::open(&checkpoint).unwrap();
    let guard = first.try_acquire().unwrap();

    let mut second = ReplayLock::open(&checkpoint).unwrap();
    assert!(second.try_acquire().is_err());

    drop(guard);
    assert!(second.try_acquire().is_ok());
}
