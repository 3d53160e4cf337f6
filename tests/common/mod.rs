//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use series_replay::sink::{PublishingSink, SinkError, SinkResult, VariableHandle};
use series_replay::Scalar;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Something the sink was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Announce { name: String, value: Scalar },
    Update { name: String, value: Scalar },
}

/// Sink that records every call with its (tokio) time offset
pub struct RecordingSink {
    start: Instant,
    events: Mutex<Vec<(Duration, SinkEvent)>>,
    next_id: AtomicUsize,
    failing_updates: HashSet<String>,
    failing_announce: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            events: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            failing_updates: HashSet::new(),
            failing_announce: None,
        }
    }

    /// Reject every update of `name`
    pub fn failing_updates_for(mut self, name: &str) -> Self {
        self.failing_updates.insert(name.to_string());
        self
    }

    /// Reject the announcement of `name`
    pub fn failing_announce_for(mut self, name: &str) -> Self {
        self.failing_announce = Some(name.to_string());
        self
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.timed_events().into_iter().map(|(_, e)| e).collect()
    }

    pub fn timed_events(&self) -> Vec<(Duration, SinkEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn announced(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Announce { name, .. } => Some(name),
                SinkEvent::Update { .. } => None,
            })
            .collect()
    }

    pub fn update_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Update { .. }))
            .count()
    }

    fn record(&self, event: SinkEvent) {
        let offset = self.start.elapsed();
        self.events.lock().unwrap().push((offset, event));
    }
}

#[async_trait]
impl PublishingSink for RecordingSink {
    async fn announce(&self, name: &str, initial: &Scalar) -> SinkResult<VariableHandle> {
        if self.failing_announce.as_deref() == Some(name) {
            return Err(SinkError::Rejected {
                name: name.to_string(),
                reason: "announce refused".to_string(),
            });
        }
        self.record(SinkEvent::Announce {
            name: name.to_string(),
            value: initial.clone(),
        });
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(VariableHandle::new(id, name))
    }

    async fn update(&self, handle: &VariableHandle, value: &Scalar) -> SinkResult<()> {
        if self.failing_updates.contains(handle.name()) {
            return Err(SinkError::Rejected {
                name: handle.name().to_string(),
                reason: "update refused".to_string(),
            });
        }
        self.record(SinkEvent::Update {
            name: handle.name().to_string(),
            value: value.clone(),
        });
        Ok(())
    }
}

pub fn announce(name: &str, value: f64) -> SinkEvent {
    SinkEvent::Announce {
        name: name.to_string(),
        value: Scalar::Number(value),
    }
}

pub fn update(name: &str, value: f64) -> SinkEvent {
    SinkEvent::Update {
        name: name.to_string(),
        value: Scalar::Number(value),
    }
}

/// Write a CSV file into `dir`
pub fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
