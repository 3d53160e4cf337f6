//! Replay engine
//!
//! Streams selected series files into a [`crate::sink::PublishingSink`]:
//! the first row announces the variables, every later row updates them after
//! a clamped delay derived from the row timestamps.

pub mod config;
pub mod engine;

pub use config::{ConfigError, DelayPolicy, DEFAULT_MAX_DELAY_SECS, DEFAULT_MIN_DELAY_SECS};
pub use engine::ReplayEngine;

use crate::resume::Checkpoint;
use crate::series::SeriesError;
use crate::sink::SinkError;
use crate::timestamp::TimestampError;
use serde::Serialize;

/// Errors that end a replay run
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// A row key is not a timestamp
    #[error("Timestamp error: {0}")]
    Timestamp(#[from] TimestampError),

    /// An input file could not be opened or read
    #[error("Series error: {0}")]
    Series(#[from] SeriesError),

    /// The sink refused to register a variable
    #[error("Failed to announce variable '{name}': {source}")]
    Announce {
        /// Variable name
        name: String,
        /// Sink failure
        #[source]
        source: SinkError,
    },
}

/// Lifecycle of a replay run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayState {
    /// Constructed, not yet started
    Idle,
    /// Registering the variables of the first row
    AnnouncingVariables,
    /// Publishing row updates
    Streaming,
    /// Finished; terminal
    Stopped,
}

impl std::fmt::Display for ReplayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReplayState::Idle => "idle",
            ReplayState::AnnouncingVariables => "announcing_variables",
            ReplayState::Streaming => "streaming",
            ReplayState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The stop handle was triggered
    Requested,
    /// Every row of every selected file was published
    Exhausted,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaySummary {
    /// Rows published, announcement row included
    pub rows_published: u64,
    /// Variable updates the sink rejected
    pub updates_failed: u64,
    /// Variable updates skipped for lack of a value
    pub columns_skipped: u64,
    /// Variables announced
    pub variables: usize,
    /// Files read to their end
    pub files_completed: usize,
    /// Last published position
    pub checkpoint: Checkpoint,
    /// Why the run ended
    pub reason: StopReason,
}
