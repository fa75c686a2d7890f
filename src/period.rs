//! Parsing of the `--period` flag into a [`DateRange`].

use crate::api::DateRange;
use chrono::NaiveDate;

/// Relative windows the Plausible API documents.
pub const KNOWN_PERIODS: &[&str] = &[
    "day", "7d", "30d", "month", "6mo", "12mo", "year", "all", "realtime",
];

pub const DEFAULT_PERIOD: &str = "day";

/// Result of interpreting a `--period` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPeriod {
    pub date_range: DateRange,
    /// Set when the value was not recognized and is passed through as-is.
    pub warning: Option<String>,
}

/// Interpret a period string.
///
/// `YYYY-MM-DD,YYYY-MM-DD` becomes a custom range. Anything else that is not
/// a known window, commas included, is not rejected; the service gets the
/// final say on it.
pub fn parse_period(value: &str) -> ParsedPeriod {
    let trimmed = value.trim();

    if let Some((start, end)) = custom_range(trimmed) {
        return ParsedPeriod {
            date_range: DateRange::custom(start, end),
            warning: None,
        };
    }

    let warning = if KNOWN_PERIODS.contains(&trimmed) {
        None
    } else {
        Some(format!(
            "Unrecognized period '{}', passing it to the API unchanged (known: {})",
            trimmed,
            KNOWN_PERIODS.join(", ")
        ))
    };

    ParsedPeriod {
        date_range: DateRange::period(trimmed),
        warning,
    }
}

fn custom_range(value: &str) -> Option<(&str, &str)> {
    let (start, end) = value.split_once(',')?;
    let (start, end) = (start.trim(), end.trim());
    let is_date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok();
    (is_date(start) && is_date(end)).then_some((start, end))
}
