//! Subtitle timestamp parsing and formatting.
//!
//! Speech engines report word boundaries as subtitle cues. This module
//! parses the cue timestamps (`HH:MM:SS.mmm`, `MM:SS.mmm`, SRT's
//! `HH:MM:SS,mmm`) into seconds and formats seconds for logs.

use thiserror::Error;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS.mmm, MM:SS.mmm or SS.mmm")]
    InvalidFormat(String),

    #[error("Invalid cue range '{0}'")]
    InvalidCue(String),
}

/// Parse a timestamp string to total seconds.
///
/// A comma decimal separator (SRT) is accepted as well as a dot (WebVTT).
///
/// # Examples
/// ```
/// use shortcast_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("00:01:30").unwrap(), 90.0);
/// assert_eq!(parse_timestamp("00:00:01,500").unwrap(), 1.5);
/// assert_eq!(parse_timestamp("02.250").unwrap(), 2.25);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }
    let normalized = ts.replace(',', ".");

    let parts: Vec<&str> = normalized.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [s] => ("0", "0", *s),
        [m, s] => ("0", *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(TimestampError::InvalidFormat(ts.to_string())),
    };

    let hours: f64 = hours
        .parse()
        .map_err(|_| TimestampError::InvalidValue("hours", hours.to_string()))?;
    let minutes: f64 = minutes
        .parse()
        .map_err(|_| TimestampError::InvalidValue("minutes", minutes.to_string()))?;
    let seconds: f64 = seconds
        .parse()
        .map_err(|_| TimestampError::InvalidValue("seconds", seconds.to_string()))?;

    if hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return Err(TimestampError::Negative);
    }

    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Parse a cue timing line such as `00:00:00.100 --> 00:00:00.450 align:start`.
///
/// Returns `(start, end)` in seconds.
pub fn parse_cue_range(line: &str) -> Result<(f64, f64), TimestampError> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| TimestampError::InvalidCue(line.to_string()))?;
    // Cue settings may follow the end timestamp
    let end = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| TimestampError::InvalidCue(line.to_string()))?;

    Ok((parse_timestamp(start)?, parse_timestamp(end)?))
}

/// Format seconds into HH:MM:SS or HH:MM:SS.mmm.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}
