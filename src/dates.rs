//! Posted-date normalization from the human text shown on a posting.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;


static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s+(minute|hour|day|week|month|year)s?\s+ago").unwrap()
});
static ISO_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());


/// Seconds per unit, with months as 30 days and years as 365.
fn unit_seconds(unit: &str) -> Option<i64> {
    match unit.to_ascii_lowercase().as_str() {
        "minute" => Some(60),
        "hour" => Some(60 * 60),
        "day" => Some(24 * 60 * 60),
        "week" => Some(7 * 24 * 60 * 60),
        "month" => Some(30 * 24 * 60 * 60),
        "year" => Some(365 * 24 * 60 * 60),
        _ => None,
    }
}


fn relative(text: &str, now: NaiveDateTime) -> Option<NaiveDate> {
    let caps = RELATIVE.captures(text)?;
    let count: i64 = caps[1].parse().ok()?;
    let seconds = count.checked_mul(unit_seconds(&caps[2])?)?;
    let delta = TimeDelta::try_seconds(seconds)?;
    now.checked_sub_signed(delta).map(|at| at.date())
}


/// Parses an RFC 3339 timestamp or anything starting with a plain `YYYY-MM-DD` date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.date_naive());
    }
    let day = raw.get(..10)?;
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            debug!("unparseable timestamp {raw:?}: {e}");
            None
        }
    }
}


/// Converts posted text into a calendar date relative to `now`.
///
/// Equivalent to [`normalize_with_hint`] without a page timestamp.
pub fn normalize(raw: &str, now: NaiveDateTime) -> NaiveDate {
    normalize_with_hint(raw, None, now)
}


/// Converts posted text into a calendar date relative to `now`.
///
/// `timestamp_hint` is a machine-readable timestamp found elsewhere on the page
/// (a `<time datetime>` attribute). It is only consulted when the text itself
/// carries no relative or absolute date. Anything unresolved falls back to the
/// date of `now`.
pub fn normalize_with_hint(raw: &str, timestamp_hint: Option<&str>, now: NaiveDateTime) -> NaiveDate {
    let today = now.date();
    let text = raw.trim().to_lowercase();
    if text.is_empty() || text.contains("today") || text.contains("just") {
        return today;
    }
    if let Some(date) = relative(&text, now) {
        return date;
    }
    if ISO_PREFIX.is_match(&text) {
        if let Some(date) = parse_timestamp(&text) {
            return date;
        }
    }
    timestamp_hint.and_then(parse_timestamp).unwrap_or(today)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_and_today_are_now() {
        assert_eq!(normalize("", now()), day(2024, 3, 15));
        assert_eq!(normalize("   ", now()), day(2024, 3, 15));
        assert_eq!(normalize("today", now()), day(2024, 3, 15));
        assert_eq!(normalize("Just now", now()), day(2024, 3, 15));
    }

    #[test]
    fn relative_units() {
        assert_eq!(normalize("30 minutes ago", now()), day(2024, 3, 15));
        assert_eq!(normalize("11 hours ago", now()), day(2024, 3, 14));
        assert_eq!(normalize("1 day ago", now()), day(2024, 3, 14));
        assert_eq!(normalize("Reposted 2 weeks ago", now()), day(2024, 3, 1));
        assert_eq!(normalize("1 month ago", now()), day(2024, 2, 14));
        assert_eq!(normalize("2 years ago", now()), day(2022, 3, 16));
    }

    #[test]
    fn minutes_cross_midnight() {
        let late = day(2024, 3, 15).and_hms_opt(0, 10, 0).unwrap();
        assert_eq!(normalize("15 minutes ago", late), day(2024, 3, 14));
    }

    #[test]
    fn absolute_text_and_hint() {
        assert_eq!(normalize("2024-01-02", now()), day(2024, 1, 2));
        assert_eq!(
            normalize_with_hint("Posted recently", Some("2023-12-31T23:00:00Z"), now()),
            day(2023, 12, 31)
        );
        assert_eq!(normalize_with_hint("Posted recently", Some("2023-11-05"), now()), day(2023, 11, 5));
    }

    #[test]
    fn relative_text_beats_hint() {
        assert_eq!(normalize_with_hint("3 days ago", Some("2020-01-01"), now()), day(2024, 3, 12));
    }

    #[test]
    fn garbage_falls_back_to_now() {
        assert_eq!(normalize_with_hint("a while back", Some("not a date"), now()), day(2024, 3, 15));
        assert_eq!(normalize("99999999999999999999 days ago", now()), day(2024, 3, 15));
    }
}
