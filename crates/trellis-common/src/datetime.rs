//! Trellis Datetime - Canonical Timestamp Handling
//!
//! All timestamps cross the adapter boundary in one canonical form
//! (`YYYY-MM-DD HH:MM:SS.mmm`, interpreted in the process default zone,
//! which is UTC) and are surfaced to callers in a UTC-tagged form. Parsing
//! is lenient: RFC 3339, the canonical form, and date-only inputs are all
//! accepted.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Canonical backend representation.
pub const FORMAT_DB: &str = "%Y-%m-%d %H:%M:%S%.3f";
/// UTC-tagged caller representation.
pub const FORMAT_TZ: &str = "%Y-%m-%dT%H:%M:%S%.3f+00:00";

/// The current time in canonical form.
pub fn now() -> String {
    format_db(Utc::now())
}

/// Format an instant in the canonical backend form.
pub fn format_db(instant: DateTime<Utc>) -> String {
    instant.format(FORMAT_DB).to_string()
}

/// Format an instant in the UTC-tagged caller form.
pub fn format_tz(instant: DateTime<Utc>) -> String {
    instant.format(FORMAT_TZ).to_string()
}

/// Leniently parse a timestamp string. Offset-carrying inputs are converted
/// to UTC; naive inputs are interpreted in the process default zone (UTC).
pub fn parse(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}

/// Re-emit a timestamp in canonical backend form, or `None` when it does
/// not parse.
pub fn to_db(input: &str) -> Option<String> {
    parse(input).map(format_db)
}

/// Re-emit a timestamp in UTC-tagged caller form, or `None` when it does
/// not parse.
pub fn to_tz(input: &str) -> Option<String> {
    parse(input).map(format_tz)
}

// =============================================================================
// Tests
// =============================================================================
