//! Replay command implementation

use crate::metrics::init_metrics;
use crate::replay::{
    DelayPolicy, ReplayEngine, ReplaySummary, DEFAULT_MAX_DELAY_SECS, DEFAULT_MIN_DELAY_SECS,
};
use crate::resume::{CheckpointStore, ReplayLock};
use crate::series::{self, CsvSeriesReader, Selection};
use crate::shutdown::SharedStop;
use crate::sink::{LogSink, PrometheusSink, PublishingSink};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, info_span, warn};

use super::CliError;

/// Resume modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode {
    /// Neither load nor save the checkpoint
    Off,
    /// Resume from the checkpoint if present, save it on stop
    On,
    /// Delete the checkpoint and start fresh
    Reset,
    /// Load the checkpoint, report what would be replayed, and exit
    Verify,
}

impl FromStr for ResumeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(ResumeMode::Off),
            "on" => Ok(ResumeMode::On),
            "reset" => Ok(ResumeMode::Reset),
            "verify" => Ok(ResumeMode::Verify),
            _ => Err(format!(
                "Invalid resume mode: {s}. Valid options: on, off, reset, verify"
            )),
        }
    }
}

impl ResumeMode {
    /// Whether progress is written back on stop
    fn persists(self) -> bool {
        matches!(self, ResumeMode::On | ResumeMode::Reset)
    }
}

/// Where replayed variables are published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Structured log events
    Log,
    /// Prometheus gauges (requires `--metrics-addr`)
    Prometheus,
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" => Ok(SinkKind::Log),
            "prometheus" => Ok(SinkKind::Prometheus),
            _ => Err(format!("Invalid sink: {s}. Valid options: log, prometheus")),
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Series Replay CLI
#[derive(Parser, Debug)]
#[command(name = "series-replay")]
#[command(about = "Replay recorded CSV time series as live variables", long_about = None)]
#[command(version)]
pub struct Cli {
    /// CSV file or directory of CSV files to replay (sorted by file name)
    #[arg(long, env = "REPLAY_INPUT")]
    pub input: PathBuf,

    /// Checkpoint file location
    #[arg(long, env = "REPLAY_CHECKPOINT", default_value = ".resume/checkpoint.json")]
    pub checkpoint: PathBuf,

    /// Shortest wait between two updates, in seconds
    #[arg(long, default_value_t = DEFAULT_MIN_DELAY_SECS, conflicts_with = "no_clamp")]
    pub min_delay: u64,

    /// Longest wait between two updates, in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_DELAY_SECS, conflicts_with = "no_clamp")]
    pub max_delay: u64,

    /// Follow the recorded gaps exactly, without clamping
    #[arg(long, default_value_t = false)]
    pub no_clamp: bool,

    /// Resume mode: on, off, reset, or verify
    #[arg(long, default_value = "on")]
    pub resume: ResumeMode,

    /// Publishing sink: log or prometheus
    #[arg(long, default_value = "log")]
    pub sink: SinkKind,

    /// Serve Prometheus metrics on this address (e.g. 0.0.0.0:9090)
    #[arg(long, env = "REPLAY_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Output format (json or human)
    #[arg(long, default_value = "human")]
    pub output_format: OutputFormat,
}

impl Cli {
    /// Delay policy selected by the flags
    pub fn delay_policy(&self) -> Result<DelayPolicy, CliError> {
        if self.no_clamp {
            return Ok(DelayPolicy::unclamped());
        }
        Ok(DelayPolicy::new(Some(self.min_delay), Some(self.max_delay))?)
    }

    /// Execute the replay until exhaustion or until `stop` is triggered
    pub async fn execute(&self, stop: SharedStop) -> Result<(), CliError> {
        let policy = self.delay_policy()?;
        let store = CheckpointStore::new(&self.checkpoint);

        // Held for the whole run so two replays never share a checkpoint
        let mut run_lock = if self.resume.persists() {
            Some(ReplayLock::open(store.path())?)
        } else {
            None
        };
        let _run_guard = run_lock
            .as_mut()
            .map(|lock| lock.try_acquire())
            .transpose()?;

        let checkpoint = match self.resume {
            ResumeMode::Off => None,
            ResumeMode::Reset => {
                info!(path = %store.path().display(), "Reset mode: deleting checkpoint");
                store.clear()?;
                None
            }
            ResumeMode::On | ResumeMode::Verify => store.load()?,
        };

        let files = series::discover_csv_files(&self.input)?;
        let selection = series::select(&files, checkpoint, &CsvSeriesReader)?;

        if self.resume == ResumeMode::Verify {
            match self.output_format {
                OutputFormat::Json => output_selection_json(&selection)?,
                OutputFormat::Human => output_selection_human(&selection),
            }
            return Ok(());
        }

        if let Some(addr) = self.metrics_addr {
            init_metrics(addr).map_err(|e| CliError::ConfigurationError(e.to_string()))?;
        }
        let sink: Arc<dyn PublishingSink> = match self.sink {
            SinkKind::Log => Arc::new(LogSink::new()),
            SinkKind::Prometheus => {
                if self.metrics_addr.is_none() {
                    return Err(CliError::ConfigurationError(
                        "--sink prometheus requires --metrics-addr".to_string(),
                    ));
                }
                Arc::new(PrometheusSink::new())
            }
        };

        let span = info_span!("replay", input = %self.input.display());
        let mut engine = ReplayEngine::new(policy, sink, stop).with_span(span);
        if self.resume.persists() {
            engine = engine.with_checkpoint_store(store);
        } else {
            warn!("Resume disabled: progress will not be saved");
        }

        let summary = engine.run(selection, &CsvSeriesReader).await?;
        match self.output_format {
            OutputFormat::Json => output_summary_json(&summary)?,
            OutputFormat::Human => output_summary_human(&summary),
        }
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string(value)
        .map_err(|e| CliError::InvalidArgument(format!("Failed to encode output: {e}")))
}

fn output_selection_json(selection: &Selection) -> Result<(), CliError> {
    let output = serde_json::json!({
        "files": selection
            .files()
            .iter()
            .map(|f| f.display().to_string())
            .collect::<Vec<_>>(),
        "checkpoint": selection.checkpoint(),
        "resume_after": selection.resume_after(),
    });
    println!("{}", to_json(&output)?);
    Ok(())
}

fn output_selection_human(selection: &Selection) {
    println!("Verify passed: {} file(s) to replay", selection.files().len());
    for file in selection.files() {
        println!("  {}", file.display());
    }
    match selection.resume_after() {
        Some(row_key) => println!(
            "Resuming after {} in {}",
            row_key,
            selection.checkpoint().file().display()
        ),
        None => println!("Starting from the first row"),
    }
}

fn output_summary_json(summary: &ReplaySummary) -> Result<(), CliError> {
    println!("{}", to_json(summary)?);
    Ok(())
}

fn output_summary_human(summary: &ReplaySummary) {
    println!("\nReplay stopped ({:?})", summary.reason);
    println!("Rows published: {}", summary.rows_published);
    println!("Variables: {}", summary.variables);
    println!("Files completed: {}", summary.files_completed);
    if summary.updates_failed > 0 {
        println!("Updates failed: {}", summary.updates_failed);
    }
    if summary.columns_skipped > 0 {
        println!("Columns skipped: {}", summary.columns_skipped);
    }
    match summary.checkpoint.row_key() {
        Some(row_key) => println!(
            "Last row: {} in {}",
            row_key,
            summary.checkpoint.file().display()
        ),
        None => println!("No rows published"),
    }
}
