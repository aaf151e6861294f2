//! Date/time parsing and formatting for datetime fields.
//!
//! Values are parsed with the source's declared format when one is given,
//! falling back to a list of common layouts, and rendered with a strftime
//! pattern.

use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: [&str; 12] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%Y%m%d",
    "%d %b %Y",
    "%b %d, %Y",
];

/// Parses `value` with one explicit format, as a datetime or as a date at
/// midnight.
pub fn parse_with_format(value: &str, format: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() || format.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(trimmed, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, format)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Parses `value`, trying `format` first and then the common layouts.
pub fn parse_datetime(value: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(dt) = format.and_then(|fmt| parse_with_format(trimmed, fmt)) {
        return Some(dt);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Renders `dt` with a strftime pattern; `None` when the pattern is invalid.
pub fn format_datetime(dt: &NaiveDateTime, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", dt.format(format)).ok()?;
    Some(out)
}

/// Whether `value` is already rendered in `format`.
pub fn is_formatted(value: &str, format: &str) -> bool {
    parse_with_format(value, format)
        .and_then(|dt| format_datetime(&dt, format))
        .is_some_and(|rendered| rendered == value.trim())
}

/// Converts `value` into `output` format.
///
/// Returns `None` when the value cannot be parsed.
pub fn reformat(value: &str, input: Option<&str>, output: &str) -> Option<String> {
    if is_formatted(value, output) {
        return Some(value.to_string());
    }
    parse_datetime(value, input).and_then(|dt| format_datetime(&dt, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_declared_format_first() {
        let dt = parse_datetime("03/04/2021", Some("%m/%d/%Y")).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2021, 3, 4).unwrap());
        let fallback = parse_datetime("03/04/2021", None).unwrap();
        assert_eq!(fallback.date(), NaiveDate::from_ymd_opt(2021, 4, 3).unwrap());
    }

    #[test]
    fn reformat_converts_and_preserves() {
        assert_eq!(
            reformat("2021-06-01T08:30:00", None, "%d-%m-%Y %H:%M").as_deref(),
            Some("01-06-2021 08:30")
        );
        assert_eq!(
            reformat("01-06-2021 08:30", None, "%d-%m-%Y %H:%M").as_deref(),
            Some("01-06-2021 08:30")
        );
        assert_eq!(reformat("soon", None, "%Y-%m-%d"), None);
    }

    #[test]
    fn invalid_pattern_does_not_panic() {
        let dt = parse_datetime("2021-06-01", None).unwrap();
        assert_eq!(format_datetime(&dt, "%Q"), None);
    }
}
