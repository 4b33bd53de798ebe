use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

/// Get the current time in seconds since the Unix epoch
pub fn current_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Render a Unix timestamp as UTC, falling back to the raw number when out of range
pub fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Calculate the time elapsed since a given timestamp
///
/// Returns 0 if the timestamp is in the future.
pub fn time_since(timestamp: u64) -> u64 {
    current_time().saturating_sub(timestamp)
}
