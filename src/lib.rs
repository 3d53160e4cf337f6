//! # Series Replay Library
//!
//! Replays time-series values recorded in CSV files as live, continuously
//! updating named variables. Updates are paced from the original recording
//! timestamps and progress is checkpointed so a stopped replay resumes exactly
//! where it left off.
//!
//! ## Features
//!
//! - **Paced Replay**: inter-update delays derived from row timestamps and
//!   clamped into a configurable `[floor, ceiling]` window
//! - **Resume Capability**: atomic checkpoint persistence on stop, resumed on
//!   the next run
//! - **Cooperative Stop**: a shared [`shutdown::StopHandle`] cuts a pending
//!   wait short without tearing a row update in half
//! - **Pluggable Sinks**: variables are announced and updated through the
//!   [`sink::PublishingSink`] trait (in-memory, log, Prometheus)
//!
//! ## Quick Start
//!
//! ```no_run
//! use series_replay::replay::{DelayPolicy, ReplayEngine};
//! use series_replay::resume::CheckpointStore;
//! use series_replay::series::{self, CsvSeriesReader};
//! use series_replay::shutdown::StopHandle;
//! use series_replay::sink::MemorySink;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let files = series::discover_csv_files("./recordings")?;
//! let store = CheckpointStore::new(".resume/checkpoint.json");
//! let checkpoint = store.load()?;
//!
//! let source = CsvSeriesReader;
//! let selection = series::select(&files, checkpoint, &source)?;
//!
//! let sink = Arc::new(MemorySink::new());
//! let stop = StopHandle::shared();
//! let mut engine = ReplayEngine::new(DelayPolicy::default(), sink, stop)
//!     .with_checkpoint_store(store);
//! let summary = engine.run(selection, &source).await?;
//! println!("published {} rows", summary.rows_published);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`timestamp`] - Row key parsing (`YYYY-MM-DD HH:MM:SS`)
//! - [`resume`] - Durable checkpoint store with atomic writes and locking
//! - [`series`] - Input discovery, CSV reading and resume-aware selection
//! - [`replay`] - The replay state machine and delay policy
//! - [`sink`] - Publishing sink trait and implementations
//! - [`shutdown`] - Stop signalling shared between host and engine
//! - [`metrics`] - Prometheus metrics for replay progress

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// CLI command implementations
pub mod cli;

/// Replay progress metrics
pub mod metrics;

/// Replay engine and delay policy
pub mod replay;

/// Resume capability for replay runs
pub mod resume;

/// Input series discovery, reading and selection
pub mod series;

/// Stop coordination shared between host and engine
pub mod shutdown;

/// Publishing sinks for replayed variables
pub mod sink;

/// Row key timestamp parsing
pub mod timestamp;

/// A scalar cell value passed through to the publishing sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Numeric value
    Number(f64),
    /// Free-form text value
    Text(String),
}

impl Scalar {
    /// Parse a CSV cell.
    ///
    /// Returns `None` for empty cells, which the replay treats as a missing
    /// column for that row.
    pub fn from_cell(cell: &str) -> Option<Self> {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return None;
        }

        match trimmed.parse::<f64>() {
            Ok(value) => Some(Scalar::Number(value)),
            Err(_) => Some(Scalar::Text(trimmed.to_string())),
        }
    }

    /// Placeholder for a variable announced from an empty cell
    pub fn missing() -> Self {
        Scalar::Text(String::new())
    }

    /// Whether this is the [`Scalar::missing`] placeholder
    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Text(text) if text.is_empty())
    }

    /// Numeric value, if this scalar is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(value) => Some(*value),
            Scalar::Text(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(value) => write!(f, "{value}"),
            Scalar::Text(text) => f.write_str(text),
        }
    }
}
