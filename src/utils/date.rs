// src/utils/date.rs

//! Publication date parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::normalize_whitespace;

const ISO_DATE: &str = "%Y-%m-%d";

/// Naive timestamp layouts seen in `datetime` attributes without an offset.
const NAIVE_TIMESTAMPS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a machine-readable date (RFC 3339 / ISO 8601).
///
/// Timestamps keep the calendar date of their own offset, so
/// `2025-06-02T09:00:00+08:00` is 2025-06-02.
pub fn parse_structured(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.date_naive());
    }
    for layout in NAIVE_TIMESTAMPS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(dt.date());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, ISO_DATE) {
        return Some(date);
    }

    // Leading date of anything else shaped like `YYYY-MM-DD...`
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, ISO_DATE).ok())
}

/// Parse a human-readable date such as `02 Jun 2025` against each format
/// in turn.
pub fn parse_human<S: AsRef<str>>(raw: &str, formats: &[S]) -> Option<NaiveDate> {
    let text = normalize_whitespace(raw);
    if text.is_empty() {
        return None;
    }

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&text, format.as_ref()).ok())
}

/// Format a date as ISO 8601 (`YYYY-MM-DD`).
pub fn to_iso(date: NaiveDate) -> String {
    date.format(ISO_DATE).to_string()
}
