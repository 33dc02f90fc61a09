//! Recognizing dates given on the command line.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

pub use daybook_revision::EntryDate;

static DATE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Accepted numeric forms, each with `year`, `month` and `day` groups.
fn date_patterns() -> &'static [Regex] {
    DATE_PATTERNS.get_or_init(|| {
        [
            r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})$",
            r"^(?P<month>\d{2})/(?P<day>\d{2})/(?P<year>\d{4})$",
            r"^(?P<day>\d{2})\.(?P<month>\d{2})\.(?P<year>\d{4})$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Invalid regex pattern - this is a compile-time constant"))
        .collect()
    })
}

/// Parse `today`, `yesterday`, `YYYY-MM-DD`, `MM/DD/YYYY` or `DD.MM.YYYY`.
///
/// Dates that don't exist on the calendar give `None`.
pub fn parse_date(input: &str, today: NaiveDate) -> Option<EntryDate> {
    let input = input.trim();
    match input {
        "today" => return Some(today.into()),
        "yesterday" => return today.pred_opt().map(Into::into),
        _ => {}
    }

    date_patterns().iter().find_map(|re| {
        let caps = re.captures(input)?;
        EntryDate::from_ymd(
            caps["year"].parse().ok()?,
            caps["month"].parse().ok()?,
            caps["day"].parse().ok()?,
        )
    })
}

/// Parse a `YYYY-MM` month.
pub fn parse_month(input: &str) -> Option<(i32, u32)> {
    let (year, month) = input.trim().split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Number of days in a month, `None` for an invalid month.
pub fn last_day(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

/// Every day of a month, in order.
pub fn month_days(year: i32, month: u32) -> impl Iterator<Item = EntryDate> {
    let last = last_day(year, month).unwrap_or(0);
    (1..=last).filter_map(move |day| EntryDate::from_ymd(year, month, day))
}

/// `March 7, 2024`
pub fn format_date(date: EntryDate) -> String {
    let naive = date.naive();
    format!("{} {}, {}", naive.format("%B"), naive.day(), naive.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<EntryDate> {
        EntryDate::from_ymd(y, m, d)
    }

    #[test]
    fn test_relative_dates() {
        assert_eq!(parse_date("today", today()), ymd(2024, 3, 1));
        assert_eq!(parse_date("yesterday", today()), ymd(2024, 2, 29));
    }

    #[test]
    fn test_numeric_formats() {
        assert_eq!(parse_date("2024-03-07", today()), ymd(2024, 3, 7));
        assert_eq!(parse_date("03/07/2024", today()), ymd(2024, 3, 7));
        assert_eq!(parse_date("07.03.2024", today()), ymd(2024, 3, 7));
    }

    #[test]
    fn test_rejects_invalid() {
        assert_eq!(parse_date("2023-02-29", today()), None);
        assert_eq!(parse_date("13/01/2024", today()), None);
        assert_eq!(parse_date("07-03-2024", today()), None);
        assert_eq!(parse_date("2024-03-07 extra", today()), None);
        assert_eq!(parse_date("07x03x2024", today()), None);
        assert_eq!(parse_date("tomorrow", today()), None);
    }

    #[test]
    fn test_last_day() {
        assert_eq!(last_day(2024, 2), Some(29));
        assert_eq!(last_day(2023, 2), Some(28));
        assert_eq!(last_day(2024, 12), Some(31));
        assert_eq!(last_day(2024, 4), Some(30));
        assert_eq!(last_day(2024, 13), None);
    }

    #[test]
    fn test_month_days_and_parse_month() {
        assert_eq!(month_days(2024, 2).count(), 29);
        assert_eq!(parse_month("2024-03"), Some((2024, 3)));
        assert_eq!(parse_month("2024-13"), None);
        assert_eq!(parse_month("24-03"), None);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(ymd(2024, 3, 7).unwrap()), "March 7, 2024");
    }
}
