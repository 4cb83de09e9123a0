pub mod config;
pub mod feedback;
pub mod insights;
pub mod plan;

use chrono::{DateTime, Utc};

/// clap value parser for RFC 3339 timestamps.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}
