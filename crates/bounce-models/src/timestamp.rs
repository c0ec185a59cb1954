//! Timestamp parsing and formatting.
//!
//! Accepts `SS`, `MM:SS` and `HH:MM:SS`, each with optional fractional seconds.

use thiserror::Error;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("timestamp cannot be empty")]
    Empty,

    #[error("timestamp cannot be negative")]
    Negative,

    #[error("invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("invalid timestamp format '{0}', use SS, MM:SS or HH:MM:SS")]
    InvalidFormat(String),
}

/// Parse a timestamp string to total seconds.
///
/// # Examples
/// ```
/// use bounce_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90.5").unwrap(), 90.5);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    const UNITS: [&str; 3] = ["hours", "minutes", "seconds"];

    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > UNITS.len() {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    // Align components to the right: "MM:SS" uses the last two units.
    let units = &UNITS[UNITS.len() - parts.len()..];
    let mut total = 0.0;
    for (part, unit) in parts.iter().zip(units) {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| TimestampError::InvalidValue(unit, part.to_string()))?;
        if !value.is_finite() {
            return Err(TimestampError::InvalidValue(unit, part.to_string()));
        }
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total = total * 60.0 + value;
    }
    Ok(total)
}

/// Format seconds as `HH:MM:SS.mmm`.
pub fn format_seconds(total_secs: f64) -> String {
    let total_ms = (total_secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let mins = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
}
