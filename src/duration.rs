use chrono::Duration;

use crate::errors::ParseError;

// @module: Clock-like duration parsing and formatting shared by both codecs

/// Fraction separator used by the line-oriented format
pub const SRT_FRACTION_SEPARATOR: char = ',';

/// Fraction separator used by the markup format
pub const TTML_FRACTION_SEPARATOR: char = '.';

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;

/// Parses a `HH:MM:SS<sep>mmm` duration.
///
/// `mmm` must be exactly 3 digits. Hours are not bounded, minutes and
/// seconds are taken as-is.
pub fn parse_duration(text: &str, fraction_separator: char) -> Result<Duration, ParseError> {
    let parts: Vec<&str> = text.split(fraction_separator).collect();
    if parts.len() != 2 {
        return Err(ParseError::MissingFraction(text.to_string()));
    }
    if parts[1].len() != 3 {
        return Err(ParseError::FractionDigits(text.to_string()));
    }
    let millis = parse_component(text, "milliseconds", parts[1])?;

    let clock: Vec<&str> = parts[0].trim().split(':').collect();
    if clock.len() != 3 {
        return Err(ParseError::MissingClock(text.to_string()));
    }
    let hours = parse_component(text, "hours", clock[0])?;
    let minutes = parse_component(text, "minutes", clock[1])?;
    let seconds = parse_component(text, "seconds", clock[2])?;

    let total = hours
        .checked_mul(MILLIS_PER_HOUR)
        .and_then(|t| t.checked_add(minutes.checked_mul(MILLIS_PER_MINUTE)?))
        .and_then(|t| t.checked_add(seconds.checked_mul(MILLIS_PER_SECOND)?))
        .and_then(|t| t.checked_add(millis))
        .ok_or_else(|| ParseError::OutOfRange(text.to_string()))?;

    Duration::try_milliseconds(total).ok_or_else(|| ParseError::OutOfRange(text.to_string()))
}

fn parse_component(input: &str, component: &'static str, value: &str) -> Result<i64, ParseError> {
    let trimmed = value.trim();
    let invalid = || ParseError::InvalidComponent {
        input: input.to_string(),
        component,
        value: trimmed.to_string(),
    };
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    trimmed.parse::<i64>().map_err(|_| invalid())
}

/// Formats a duration as `HH:MM:SS<sep>mmm`.
///
/// Sub-millisecond precision is truncated. Hours grow past 24 without
/// wrapping; negative durations get a leading `-`.
pub fn format_duration(duration: Duration, fraction_separator: char) -> String {
    let total = duration.num_milliseconds();
    let sign = if total < 0 { "-" } else { "" };
    let ms = total.unsigned_abs();

    let hours = ms / MILLIS_PER_HOUR as u64;
    let minutes = (ms % MILLIS_PER_HOUR as u64) / MILLIS_PER_MINUTE as u64;
    let seconds = (ms % MILLIS_PER_MINUTE as u64) / MILLIS_PER_SECOND as u64;
    let millis = ms % MILLIS_PER_SECOND as u64;

    format!(
        "{}{:02}:{:02}:{:02}{}{:03}",
        sign, hours, minutes, seconds, fraction_separator, millis
    )
}
