// Utility helpers for parsing and formatting.
//
// This module centralizes the "dirty" spreadsheet handling (header text,
// mixed date formats, Excel serials) so the rest of the code can assume
// clean, typed values.
use crate::error::{ReportError, Result};
use crate::types::Cell;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use num_format::{Locale, ToFormattedString};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Clean a raw header: trim, collapse newlines/tabs/runs of spaces into a
/// single space. `nan`-like placeholders become the empty string.
pub fn sanitize_column_name(raw: &str) -> String {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("none") {
        return String::new();
    }
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Header cells that carry no name: blank, `nan`, or pandas-style `Unnamed: 3`.
pub fn is_placeholder_header(raw: &str) -> bool {
    let s = sanitize_column_name(raw);
    s.is_empty() || s.to_lowercase().starts_with("unnamed")
}

/// Parse a text cell into a timestamp, trying a fixed list of formats.
/// Returns `None` for anything that cannot be parsed.
pub fn parse_datetime_safe(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Convert an Excel 1900-system serial (days since 1899-12-30) to a timestamp.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let days = serial.trunc() as i64;
    let secs = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(secs))
}

/// Coerce any cell to a timestamp. Malformed values become `None`.
pub fn cell_to_datetime(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Number(f) => excel_serial_to_datetime(*f),
        Cell::Text(s) => parse_datetime_safe(Some(s)),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// Strict `YYYY-MM-DD` parsing for request parameters.
pub fn parse_request_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ReportError::InvalidDate(s.to_string()))
}

/// The Monday..Sunday week before the week containing `reference`.
pub fn last_week_range(reference: NaiveDate) -> (NaiveDate, NaiveDate) {
    let back = reference.weekday().num_days_from_monday() as i64 + 7;
    let start = reference - Duration::days(back);
    (start, start + Duration::days(6))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `1,204 tickets`).
    n.to_formatted_string(&Locale::en)
}
