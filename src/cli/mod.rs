//! CLI command implementations

pub mod error;
pub mod replay;

pub use error::CliError;
pub use replay::{Cli, OutputFormat, ResumeMode, SinkKind};
