//! Replay observability metrics
//!
//! This module exposes replay progress and the replayed variables themselves
//! through the `metrics` facade.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate for low-overhead metric collection
//! - Prometheus exporter for scraping endpoint (e.g. `0.0.0.0:9090/metrics`)
//! - Every call is a no-op until [`init_metrics`] installs a recorder

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info};

/// Set once the Prometheus exporter is installed
static METRICS_ADDR: OnceCell<SocketAddr> = OnceCell::new();

/// Gauge holding the value of each numeric replayed variable
pub const VARIABLE_VALUE_GAUGE: &str = "replay_variable_value";

/// Initialize metrics system with Prometheus exporter
///
/// Must be called from within a tokio runtime. Idempotent: later calls are
/// ignored.
///
/// # Arguments
/// * `addr` - Socket address to bind the Prometheus scrape endpoint
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(existing) = METRICS_ADDR.get() {
        debug!(addr = %existing, "Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "replay_rows_total",
        Unit::Count,
        "Total number of rows published (announcement row included)"
    );

    describe_counter!(
        "replay_updates_failed_total",
        Unit::Count,
        "Total number of variable updates rejected by the sink"
    );

    describe_counter!(
        "replay_columns_skipped_total",
        Unit::Count,
        "Total number of column updates skipped because the row lacked the column"
    );

    describe_histogram!(
        "replay_delay_seconds",
        Unit::Seconds,
        "Clamped delay waited before each row update"
    );

    describe_gauge!(
        "replay_variables",
        Unit::Count,
        "Number of variables announced in this run"
    );

    describe_gauge!(
        VARIABLE_VALUE_GAUGE,
        "Current value of each numeric replayed variable"
    );

    let _ = METRICS_ADDR.set(addr);
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Publish the value of a replayed variable
pub fn record_variable_value(name: &str, value: f64) {
    gauge!(VARIABLE_VALUE_GAUGE, "variable" => name.to_string()).set(value);
}

/// Per-run replay counters, mirrored into the global recorder
#[derive(Debug, Clone, Default)]
pub struct ReplayMetrics {
    rows_published: u64,
    updates_failed: u64,
    columns_skipped: u64,
}

impl ReplayMetrics {
    /// Fresh counters
    pub fn new() -> Self {
        Self::default()
    }

    /// A row was fully published
    pub fn record_row(&mut self) {
        self.rows_published += 1;
        counter!("replay_rows_total").increment(1);
    }

    /// The sink rejected an update
    pub fn record_update_failure(&mut self, variable: &str) {
        self.updates_failed += 1;
        counter!("replay_updates_failed_total", "variable" => variable.to_string()).increment(1);
    }

    /// A row had no value for a variable
    pub fn record_column_skipped(&mut self, variable: &str) {
        self.columns_skipped += 1;
        counter!("replay_columns_skipped_total", "variable" => variable.to_string())
            .increment(1);
    }

    /// Delay about to be waited
    pub fn record_delay(&self, delay: Duration) {
        histogram!("replay_delay_seconds").record(delay.as_secs_f64());
    }

    /// Variables announced
    pub fn record_variables(&self, count: usize) {
        gauge!("replay_variables").set(count as f64);
    }

    /// Rows published so far
    pub fn rows_published(&self) -> u64 {
        self.rows_published
    }

    /// Updates rejected so far
    pub fn updates_failed(&self) -> u64 {
        self.updates_failed
    }

    /// Column updates skipped so far
    pub fn columns_skipped(&self) -> u64 {
        self.columns_skipped
    }
}
