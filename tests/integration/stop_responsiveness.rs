//! Stop requests during a replay

use crate::common::{announce, update, write_csv, RecordingSink};
use series_replay::replay::{DelayPolicy, ReplayEngine, ReplayState, StopReason};
use series_replay::resume::{Checkpoint, CheckpointStore};
use series_replay::series::{self, CsvSeriesReader};
use series_replay::shutdown::StopHandle;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

const ROWS: &str = "time,x\n\
                    2024-01-01 00:00:00,1\n\
                    2024-01-01 00:00:45,2\n\
                    2024-01-01 00:01:30,3\n";

#[tokio::test(start_paused = true)]
async fn test_stop_during_wait_shortens_it() {
    let dir = TempDir::new().unwrap();
    let file = write_csv(dir.path(), "a.csv", ROWS);
    let store = CheckpointStore::new(dir.path().join("checkpoint.json"));

    let selection = series::select(&[file.clone()], None, &CsvSeriesReader).unwrap();
    let sink = Arc::new(RecordingSink::new());
    let stop = StopHandle::shared();
    let mut engine = ReplayEngine::new(DelayPolicy::default(), sink.clone(), stop.clone())
        .with_checkpoint_store(store.clone());

    let started = Instant::now();
    let run = tokio::spawn(async move {
        let summary = engine.run(selection, &CsvSeriesReader).await;
        (engine, summary)
    });

    // The engine is now inside its first 30s wait
    tokio::time::sleep(Duration::from_secs(10)).await;
    stop.request_stop();

    let (engine, summary) = run.await.unwrap();
    let summary = summary.unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(summary.reason, StopReason::Requested);
    assert_eq!(engine.state(), ReplayState::Stopped);
    // Pending row discarded: only the announcement went out
    assert_eq!(sink.events(), vec![announce("x", 1.0)]);
    assert_eq!(
        store.load().unwrap(),
        Some(Checkpoint::at_row(&file, "2024-01-01 00:00:00"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_after_update_keeps_that_update() {
    let dir = TempDir::new().unwrap();
    let file = write_csv(dir.path(), "a.csv", ROWS);
    let store = CheckpointStore::new(dir.path().join("checkpoint.json"));

    let selection = series::select(&[file.clone()], None, &CsvSeriesReader).unwrap();
    let sink = Arc::new(RecordingSink::new());
    let stop = StopHandle::shared();
    let mut engine = ReplayEngine::new(DelayPolicy::default(), sink.clone(), stop.clone())
        .with_checkpoint_store(store.clone());

    let run = tokio::spawn(async move { engine.run(selection, &CsvSeriesReader).await });

    // First update lands at 30s, second wait runs until 75s
    tokio::time::sleep(Duration::from_secs(50)).await;
    stop.request_stop();

    let summary = run.await.unwrap().unwrap();

    assert_eq!(summary.reason, StopReason::Requested);
    assert_eq!(summary.rows_published, 2);
    assert_eq!(sink.events(), vec![announce("x", 1.0), update("x", 2.0)]);
    assert_eq!(
        store.load().unwrap(),
        Some(Checkpoint::at_row(&file, "2024-01-01 00:00:45"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_repeated_stop_requests_are_harmless() {
    let dir = TempDir::new().unwrap();
    let file = write_csv(dir.path(), "a.csv", ROWS);

    let selection = series::select(&[file], None, &CsvSeriesReader).unwrap();
    let sink = Arc::new(RecordingSink::new());
    let stop = StopHandle::shared();
    let mut engine = ReplayEngine::new(DelayPolicy::default(), sink.clone(), stop.clone());

    let run = tokio::spawn(async move { engine.run(selection, &CsvSeriesReader).await });

    tokio::time::sleep(Duration::from_secs(5)).await;
    stop.request_stop();
    stop.request_stop();

    let summary = tokio::time::timeout(Duration::from_secs(1), run)
        .await
        .expect("engine did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(summary.reason, StopReason::Requested);
    assert_eq!(summary.rows_published, 1);
}
