//! Human-readable formatting for sizes and revision timestamps.

use chrono::{Datelike, Local, NaiveDate, TimeZone};

/// Format a size in bytes (`512 B`, `1.5 KiB`).
pub fn format_size(size: u64) -> String {
    if size > 1024 {
        let kib = format!("{:.2}", size as f64 / 1024.0);
        let kib = kib.trim_end_matches('0').trim_end_matches('.');
        return format!("{kib} KiB");
    }
    format!("{size} B")
}

/// Format a unix timestamp relative to the current local date.
///
/// The year is omitted for the current year and the day for today, unless
/// `full` is set. A zero timestamp is rendered as `unknown`.
pub fn format_time(ts: i64, full: bool) -> String {
    format_time_at(ts, full, Local::now().date_naive())
}

/// Like [`format_time`], relative to an explicit `today`.
pub fn format_time_at(ts: i64, full: bool, today: NaiveDate) -> String {
    if ts == 0 {
        return "unknown".to_string();
    }
    let Some(dt) = Local.timestamp_opt(ts, 0).single() else {
        return "unknown".to_string();
    };

    let mut parts = Vec::with_capacity(3);
    if full || dt.year() != today.year() {
        parts.push("%Y");
    }
    if full || (dt.month(), dt.day()) != (today.month(), today.day()) {
        parts.push("%b %d");
    }
    parts.push("%H:%M");

    dt.format(&parts.join(" ")).to_string()
}
