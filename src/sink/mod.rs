//! Publishing sinks for replayed variables
//!
//! The replay engine announces each variable once and then pushes updates.
//! What "publishing" means is up to the sink: an in-process registry, a log
//! stream, or Prometheus gauges.

use crate::Scalar;
use async_trait::async_trait;

pub mod log;
pub mod memory;
pub mod prometheus;

pub use self::log::LogSink;
pub use self::memory::{MemorySink, Variable};
pub use self::prometheus::PrometheusSink;

/// Sink errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The sink refused the call
    #[error("sink rejected {name}: {reason}")]
    Rejected {
        /// Variable name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// The value type cannot be represented by this sink
    #[error("sink cannot represent value of {name}: {value}")]
    Unsupported {
        /// Variable name
        name: String,
        /// Offending value
        value: String,
    },

    /// Handle was not issued by this sink
    #[error("unknown variable handle {0}")]
    UnknownHandle(usize),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Handle to an announced variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableHandle {
    id: usize,
    name: String,
}

impl VariableHandle {
    /// Create a handle; sinks assign ids
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Sink-assigned id
    pub fn id(&self) -> usize {
        self.id
    }

    /// Variable name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Receiver of variable announcements and updates
///
/// `announce` failures are fatal to a replay (the variable set must be
/// complete before streaming); `update` failures are logged and skipped.
#[async_trait]
pub trait PublishingSink: Send + Sync {
    /// Create a variable with its initial value
    async fn announce(&self, name: &str, initial: &Scalar) -> SinkResult<VariableHandle>;

    /// Push a new value for an announced variable
    async fn update(&self, handle: &VariableHandle, value: &Scalar) -> SinkResult<()>;
}
