//! Replay state machine
//!
//! One engine drives one run: announce the variables found in the first
//! unpublished row, then stream every following row as updates, waiting a
//! clamped delay before each. Progress lives in an in-memory checkpoint that
//! is persisted once, when the run stops.

use super::{DelayPolicy, ReplayError, ReplayState, ReplaySummary, StopReason};
use crate::metrics::ReplayMetrics;
use crate::resume::{Checkpoint, CheckpointStore};
use crate::series::{published_rows, SeriesHeader, SeriesRow, SeriesSource, Selection};
use crate::shutdown::SharedStop;
use crate::sink::{PublishingSink, VariableHandle};
use crate::timestamp;
use crate::Scalar;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument, Span};

/// Mutable state of a single run
struct Progress {
    checkpoint: Checkpoint,
    /// Whether a row has been consumed since the run started
    dirty: bool,
    /// Instant of the last row sent as an update
    previous_instant: Option<NaiveDateTime>,
    /// Variables in announcement order; `None` until announced
    handles: Option<Vec<VariableHandle>>,
    metrics: ReplayMetrics,
    files_completed: usize,
}

impl Progress {
    fn new(checkpoint: Checkpoint) -> Self {
        Self {
            checkpoint,
            dirty: false,
            previous_instant: None,
            handles: None,
            metrics: ReplayMetrics::new(),
            files_completed: 0,
        }
    }

    fn consume(&mut self, file: &Path, row: &SeriesRow) {
        self.checkpoint.advance(file, &row.key);
        self.dirty = true;
        self.metrics.record_row();
    }

    fn summary(self, reason: StopReason) -> ReplaySummary {
        ReplaySummary {
            rows_published: self.metrics.rows_published(),
            updates_failed: self.metrics.updates_failed(),
            columns_skipped: self.metrics.columns_skipped(),
            variables: self.handles.as_ref().map_or(0, Vec::len),
            files_completed: self.files_completed,
            checkpoint: self.checkpoint,
            reason,
        }
    }
}

/// Replays selected series files into a publishing sink
pub struct ReplayEngine {
    policy: DelayPolicy,
    sink: Arc<dyn PublishingSink>,
    store: Option<CheckpointStore>,
    stop: SharedStop,
    span: Span,
    state: ReplayState,
}

impl std::fmt::Debug for ReplayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayEngine")
            .field("policy", &self.policy)
            .field("store", &self.store)
            .field("stop_requested", &self.stop.is_stop_requested())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ReplayEngine {
    /// Create an engine that does not persist its progress
    pub fn new(policy: DelayPolicy, sink: Arc<dyn PublishingSink>, stop: SharedStop) -> Self {
        Self {
            policy,
            sink,
            store: None,
            stop,
            span: Span::none(),
            state: ReplayState::Idle,
        }
    }

    /// Persist the checkpoint to `store` when the run stops
    pub fn with_checkpoint_store(mut self, store: CheckpointStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Emit the run's events inside `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Delay policy in effect
    pub fn policy(&self) -> DelayPolicy {
        self.policy
    }

    /// Replay `selection` until every row is published or a stop is requested
    ///
    /// The checkpoint is saved when the run ends, including after a
    /// malformed row or timestamp. A failed save is logged and does not fail
    /// the run. An announce failure is returned without saving.
    ///
    /// # Errors
    /// - [`ReplayError::Series`] when a file cannot be read or a row is malformed
    /// - [`ReplayError::Timestamp`] when a row key is not a timestamp
    /// - [`ReplayError::Announce`] when the sink refuses a variable
    pub async fn run<S: SeriesSource + ?Sized>(
        &mut self,
        selection: Selection,
        source: &S,
    ) -> Result<ReplaySummary, ReplayError> {
        let span = self.span.clone();
        self.run_inner(selection, source).instrument(span).await
    }

    async fn run_inner<S: SeriesSource + ?Sized>(
        &mut self,
        selection: Selection,
        source: &S,
    ) -> Result<ReplaySummary, ReplayError> {
        let (files, checkpoint, resume_after) = selection.into_parts();
        info!(
            files = files.len(),
            resume_after = resume_after.as_deref().unwrap_or("<none>"),
            floor = ?self.policy.floor(),
            ceiling = ?self.policy.ceiling(),
            "Starting replay"
        );

        let mut progress = Progress::new(checkpoint);
        let outcome = self
            .stream(&files, resume_after.as_deref(), source, &mut progress)
            .await;
        self.transition(ReplayState::Stopped);

        if progress.dirty {
            self.persist(&progress.checkpoint).await;
        }

        match outcome {
            Ok(reason) => {
                let summary = progress.summary(reason);
                info!(
                    reason = ?summary.reason,
                    rows = summary.rows_published,
                    updates_failed = summary.updates_failed,
                    columns_skipped = summary.columns_skipped,
                    files_completed = summary.files_completed,
                    "Replay stopped"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(
                    error = %e,
                    rows = progress.metrics.rows_published(),
                    "Replay aborted"
                );
                Err(e)
            }
        }
    }

    async fn stream<S: SeriesSource + ?Sized>(
        &mut self,
        files: &[PathBuf],
        resume_after: Option<&str>,
        source: &S,
        progress: &mut Progress,
    ) -> Result<StopReason, ReplayError> {
        for (index, file) in files.iter().enumerate() {
            if self.stop.is_stop_requested() {
                return Ok(StopReason::Requested);
            }

            let skip = match resume_after {
                Some(row_key) if index == 0 => published_rows(source, file, row_key)?,
                _ => 0,
            };
            let mut series = source.open(file)?;
            info!(file = %file.display(), skip, "Replaying file");

            let mut positions = progress
                .handles
                .as_deref()
                .map(|handles| column_positions(handles, &series.header, file));

            for row in series.rows.by_ref().skip(skip) {
                if self.stop.is_stop_requested() {
                    return Ok(StopReason::Requested);
                }
                let row = row?;
                let instant = timestamp::parse(&row.key)?;

                match (&positions, progress.handles.as_deref()) {
                    (Some(positions), Some(handles)) => {
                        let delay = self.policy.delay_between(progress.previous_instant, instant);
                        if !self.suspend(delay, &progress.metrics).await {
                            return Ok(StopReason::Requested);
                        }
                        self.publish(&row, handles, positions, &mut progress.metrics)
                            .await;
                        progress.previous_instant = Some(instant);
                    }
                    _ => {
                        let handles = self.announce(&series.header, &row).await?;
                        positions = Some(column_positions(&handles, &series.header, file));
                        progress.metrics.record_variables(handles.len());
                        progress.handles = Some(handles);
                        self.transition(ReplayState::Streaming);
                    }
                }

                progress.consume(file, &row);
            }

            progress.files_completed += 1;
            info!(file = %file.display(), rows = progress.metrics.rows_published(), "File completed");
        }

        Ok(StopReason::Exhausted)
    }

    /// Register every header column with its value in the first row
    ///
    /// A column whose first cell is empty is announced with
    /// [`Scalar::missing`] and receives values from later rows.
    async fn announce(
        &mut self,
        header: &SeriesHeader,
        row: &SeriesRow,
    ) -> Result<Vec<VariableHandle>, ReplayError> {
        self.transition(ReplayState::AnnouncingVariables);

        let mut handles = Vec::with_capacity(header.columns.len());
        let missing = Scalar::missing();
        for (index, name) in header.columns.iter().enumerate() {
            let value = match row.cells.get(index).and_then(Option::as_ref) {
                Some(value) => value,
                None => {
                    debug!(variable = %name, row_key = %row.key, "Empty cell, announced without a value");
                    &missing
                }
            };
            let handle = self
                .sink
                .announce(name, value)
                .await
                .map_err(|source| ReplayError::Announce {
                    name: name.clone(),
                    source,
                })?;
            handles.push(handle);
        }

        info!(variables = handles.len(), row_key = %row.key, "Variables announced");
        Ok(handles)
    }

    /// Wait `delay`, returning `false` when a stop cut the wait short
    async fn suspend(&self, delay: Duration, metrics: &ReplayMetrics) -> bool {
        if self.stop.is_stop_requested() {
            return false;
        }
        metrics.record_delay(delay);
        if delay.is_zero() {
            return true;
        }

        debug!(delay_secs = delay.as_secs(), "Waiting before next update");
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.stop.wait_for_stop() => {
                info!("Stop requested during wait, pending row discarded");
                false
            }
        }
    }

    async fn publish(
        &self,
        row: &SeriesRow,
        handles: &[VariableHandle],
        positions: &[Option<usize>],
        metrics: &mut ReplayMetrics,
    ) {
        for (handle, position) in handles.iter().zip(positions) {
            let value = position
                .and_then(|p| row.cells.get(p))
                .and_then(Option::as_ref);
            let Some(value) = value else {
                debug!(variable = %handle.name(), row_key = %row.key, "No value, update skipped");
                metrics.record_column_skipped(handle.name());
                continue;
            };

            if let Err(e) = self.sink.update(handle, value).await {
                warn!(
                    variable = %handle.name(),
                    row_key = %row.key,
                    error = %e,
                    "Variable update failed"
                );
                metrics.record_update_failure(handle.name());
            }
        }
    }

    async fn persist(&self, checkpoint: &Checkpoint) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let checkpoint = checkpoint.clone();

        match tokio::task::spawn_blocking(move || store.save(&checkpoint)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Failed to save checkpoint"),
            Err(e) => error!(error = %e, "Checkpoint save task failed"),
        }
    }

    fn transition(&mut self, next: ReplayState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Replay state change");
            self.state = next;
        }
    }
}

/// Index of each announced variable in `header`
fn column_positions(
    handles: &[VariableHandle],
    header: &SeriesHeader,
    file: &Path,
) -> Vec<Option<usize>> {
    for column in &header.columns {
        if !handles.iter().any(|h| h.name() == column) {
            warn!(file = %file.display(), column = %column, "Column was not announced, ignoring");
        }
    }

    handles
        .iter()
        .map(|handle| {
            let position = header.position(handle.name());
            if position.is_none() {
                debug!(file = %file.display(), variable = %handle.name(), "Variable absent from file");
            }
            position
        })
        .collect()
}
