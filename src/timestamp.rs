//! Row key timestamp parsing
//!
//! Every row in a recorded series is keyed by a timestamp in the fixed format
//! `YYYY-MM-DD HH:MM:SS`. Anything else is corrupt source data.

use chrono::NaiveDateTime;

/// Fixed row key format
pub const ROW_KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    /// Input did not match `YYYY-MM-DD HH:MM:SS`
    #[error("malformed timestamp: {0:?} (expected YYYY-MM-DD HH:MM:SS)")]
    Malformed(String),
}

/// Parse a row key into a comparable instant
pub fn parse(text: &str) -> Result<NaiveDateTime, TimestampError> {
    // chrono tolerates some padding variations; the row key format does not
    if text.len() != 19 {
        return Err(TimestampError::Malformed(text.to_string()));
    }

    NaiveDateTime::parse_from_str(text, ROW_KEY_FORMAT)
        .map_err(|_| TimestampError::Malformed(text.to_string()))
}

/// Signed number of whole seconds from `previous` to `current`
pub fn seconds_between(previous: &str, current: &str) -> Result<i64, TimestampError> {
    let previous = parse(previous)?;
    let current = parse(current)?;
    Ok((current - previous).num_seconds())
}
