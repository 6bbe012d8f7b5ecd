//! Specifies how dates and timestamps are read from and written to JSON.
//!
//! Calendar dates use ISO 8601, e.g. "2024-09-01", via [iso_date]. Timestamps use
//! RFC 3339 via `time::serde::rfc3339`.

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

/// Calendar date format, e.g. "2024-09-01".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Parse a calendar date such as "2024-09-01".
///
/// Returns `None` if the text is not a valid date in that format.
pub fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text.trim(), DATE_FORMAT).ok()
}
