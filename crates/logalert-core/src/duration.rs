//! Duration strings used by rules and config ("30s", "5m", "1h30m")

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration {input:?}: {reason}")]
    Invalid { input: String, reason: String },
}

/// Parse a compact duration string such as `"5m"`, `"90s"` or `"1h30m"`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationError::Empty);
    }
    humantime::parse_duration(trimmed).map_err(|e| DurationError::Invalid {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

// parse or fall back, used for every optional "timeout"-style setting
pub fn parse_duration_or(input: &str, default: Duration) -> Duration {
    parse_duration(input).unwrap_or(default)
}
