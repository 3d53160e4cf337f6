//! Replay pacing configuration

use chrono::NaiveDateTime;
use std::time::Duration;

/// Default lower bound for the wait between two updates.
/// Recorded series are often sampled every few seconds; replaying them at
/// that pace floods consumers, so waits shorter than this are stretched.
pub const DEFAULT_MIN_DELAY_SECS: u64 = 30;

/// Default upper bound for the wait between two updates.
/// Gaps in a recording (night shifts, outages) would otherwise freeze the
/// replay for hours.
pub const DEFAULT_MAX_DELAY_SECS: u64 = 60;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Floor above ceiling
    #[error("invalid delay bounds: floor {floor}s is above ceiling {ceiling}s")]
    InvalidDelayBounds {
        /// Requested floor in seconds
        floor: u64,
        /// Requested ceiling in seconds
        ceiling: u64,
    },
}

/// How timestamp gaps turn into waits
///
/// A computed gap is clamped into `[floor, ceiling]`; either bound may be
/// absent. Without bounds, zero and negative gaps mean "no wait".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    floor: Option<u64>,
    ceiling: Option<u64>,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            floor: Some(DEFAULT_MIN_DELAY_SECS),
            ceiling: Some(DEFAULT_MAX_DELAY_SECS),
        }
    }
}

impl DelayPolicy {
    /// Create a policy with explicit bounds (seconds)
    pub fn new(floor: Option<u64>, ceiling: Option<u64>) -> Result<Self, ConfigError> {
        if let (Some(floor), Some(ceiling)) = (floor, ceiling) {
            if floor > ceiling {
                return Err(ConfigError::InvalidDelayBounds { floor, ceiling });
            }
        }
        Ok(Self { floor, ceiling })
    }

    /// Legacy pacing: waits follow the recording exactly, no clamping
    pub fn unclamped() -> Self {
        Self {
            floor: None,
            ceiling: None,
        }
    }

    /// Lower bound in seconds
    pub fn floor(&self) -> Option<u64> {
        self.floor
    }

    /// Upper bound in seconds
    pub fn ceiling(&self) -> Option<u64> {
        self.ceiling
    }

    /// Clamp a raw gap (seconds, possibly negative) into a wait
    pub fn clamp(&self, raw_secs: i64) -> Duration {
        let mut secs = raw_secs;
        if let Some(ceiling) = self.ceiling {
            secs = secs.min(i64::try_from(ceiling).unwrap_or(i64::MAX));
        }
        if let Some(floor) = self.floor {
            secs = secs.max(i64::try_from(floor).unwrap_or(i64::MAX));
        }
        Duration::from_secs(secs.max(0) as u64)
    }

    /// Wait before publishing the row at `current`
    ///
    /// `previous` is `None` for the first update after announcement, whose
    /// raw gap is zero.
    pub fn delay_between(&self, previous: Option<NaiveDateTime>, current: NaiveDateTime) -> Duration {
        let raw = previous
            .map(|previous| (current - previous).num_seconds())
            .unwrap_or(0);
        self.clamp(raw)
    }
}
