//! Strict-format validation for user-typed dates, times and UTC offsets
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Return the parsed value instead of a bare bool
//! - 1.0.0: Initial date/time checks
//!
//! Every function takes the reference clock as an argument so results are
//! deterministic under test. Callers pass the user-local "now"; nothing in
//! here reads the system clock.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex"));
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("time regex"));
static OFFSET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]\d{1,2}$").expect("offset regex"));

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Westernmost UTC offset we accept, in whole hours.
pub const MIN_UTC_OFFSET: i32 = -12;
/// Easternmost UTC offset we accept, in whole hours.
pub const MAX_UTC_OFFSET: i32 = 14;

/// Parse a user-typed date. Accepts strict `YYYY-MM-DD` that names a real
/// calendar day on or after `today`; anything else is rejected.
pub fn date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let input = input.trim();
    if !DATE_RE.is_match(input) {
        return None;
    }
    let parsed = NaiveDate::parse_from_str(input, DATE_FORMAT).ok()?;
    (parsed >= today).then_some(parsed)
}

/// Parse a user-typed time for a previously validated `date`. Accepts strict
/// `HH:MM`; the combined instant must be strictly after `now`.
pub fn time(input: &str, date: NaiveDate, now: NaiveDateTime) -> Option<NaiveTime> {
    let input = input.trim();
    if !TIME_RE.is_match(input) {
        return None;
    }
    let parsed = NaiveTime::parse_from_str(input, TIME_FORMAT).ok()?;
    (date.and_time(parsed) > now).then_some(parsed)
}

/// Parse a user-typed UTC offset like `+3` or `-5`. The sign is mandatory and
/// the value must fall inside the real offset range (-12 to +14 hours).
pub fn utc_offset(input: &str) -> Option<i32> {
    let input = input.trim();
    if !OFFSET_RE.is_match(input) {
        return None;
    }
    let value: i32 = input.parse().ok()?;
    (MIN_UTC_OFFSET..=MAX_UTC_OFFSET)
        .contains(&value)
        .then_some(value)
}
