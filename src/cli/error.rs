//! CLI error types and conversions

use crate::replay::{ConfigError, ReplayError};
use crate::resume::CheckpointError;
use crate::series::SeriesError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Input discovery or selection error
    #[error("series error: {0}")]
    SeriesError(#[from] SeriesError),

    /// Checkpoint error
    #[error("checkpoint error: {0}")]
    CheckpointError(#[from] CheckpointError),

    /// Replay error
    #[error("replay error: {0}")]
    ReplayError(#[from] ReplayError),

    /// Delay policy error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
