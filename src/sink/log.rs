//! Sink that publishes variables as structured log events

use super::{PublishingSink, SinkResult, VariableHandle};
use crate::Scalar;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Emits every announce and update through `tracing`
#[derive(Debug, Default)]
pub struct LogSink {
    next_id: AtomicUsize,
}

impl LogSink {
    /// Create a log sink
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PublishingSink for LogSink {
    async fn announce(&self, name: &str, initial: &Scalar) -> SinkResult<VariableHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(variable = %name, id, value = %initial, "Variable announced");
        Ok(VariableHandle::new(id, name))
    }

    async fn update(&self, handle: &VariableHandle, value: &Scalar) -> SinkResult<()> {
        info!(variable = %handle.name(), id = handle.id(), value = %value, "Variable updated");
        Ok(())
    }
}
