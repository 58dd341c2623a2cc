//! Date parsing for date comparison rules
//!
//! Accepts `day.month.year`, a bare year, and `month.year`. Partial dates
//! resolve to the first day of the year or month.

use crate::constants::{DATE_SEPARATOR, DEFAULT_DATE_IGNORE};
use crate::{Error, Result};
use chrono::NaiveDate;

/// Parse a date string, stripping every `ignore` occurrence first
///
/// Formats are tried in order: `d.m.yyyy`, `yyyy`, `m.yyyy`.
pub fn parse_date_with(text: &str, ignore: &[&str]) -> Result<NaiveDate> {
    let mut cleaned = text.to_string();
    for pattern in ignore.iter().filter(|p| !p.is_empty()) {
        cleaned = cleaned.replace(pattern, "");
    }
    let cleaned = cleaned.trim();

    let parts: Vec<&str> = cleaned.split(DATE_SEPARATOR).map(str::trim).collect();

    let date = match parts.as_slice() {
        [day, month, year] => build_date(year, month, day),
        [year] => parse_year(year).and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
        [month, year] => build_date(year, month, "1"),
        _ => None,
    };

    date.ok_or_else(|| Error::date_format(text))
}

/// Parse a date string with the default ignore characters (`?`)
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    parse_date_with(text, DEFAULT_DATE_IGNORE)
}

fn build_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let year = parse_year(year)?;
    let month = parse_small(month)?;
    let day = parse_small(day)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Four-digit year
fn parse_year(token: &str) -> Option<i32> {
    if token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}

/// One- or two-digit day or month
fn parse_small(token: &str) -> Option<u32> {
    if (1..=2).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}
