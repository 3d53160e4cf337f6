//! Sink that exposes numeric variables as Prometheus gauges
//!
//! Each variable becomes a `replay_variable_value{variable="<name>"}` series
//! on the exporter installed by [`crate::metrics::init_metrics`]. Text values
//! have no gauge representation.

use super::{PublishingSink, SinkError, SinkResult, VariableHandle};
use crate::metrics::record_variable_value;
use crate::Scalar;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Publishes variables through the metrics recorder
#[derive(Debug, Default)]
pub struct PrometheusSink {
    next_id: AtomicUsize,
}

impl PrometheusSink {
    /// Create a Prometheus sink
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PublishingSink for PrometheusSink {
    async fn announce(&self, name: &str, initial: &Scalar) -> SinkResult<VariableHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match initial.as_f64() {
            Some(value) => record_variable_value(name, value),
            None if initial.is_missing() => record_variable_value(name, f64::NAN),
            None => {
                // Registered so later numeric updates land; NaN until then
                warn!(variable = %name, value = %initial, "Text variable has no gauge value");
                record_variable_value(name, f64::NAN);
            }
        }
        debug!(variable = %name, id, "Gauge registered");
        Ok(VariableHandle::new(id, name))
    }

    async fn update(&self, handle: &VariableHandle, value: &Scalar) -> SinkResult<()> {
        let number = value.as_f64().ok_or_else(|| SinkError::Unsupported {
            name: handle.name().to_string(),
            value: value.to_string(),
        })?;
        record_variable_value(handle.name(), number);
        Ok(())
    }
}
