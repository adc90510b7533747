use std::sync::OnceLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use tracing::debug;

// ── Sheet date parsing ────────────────────────────────────────────────────────

/// `D.M.YYYY` or `D/M/YYYY` at the start of a cell. Day and month take one
/// or two digits; the separator must be the same on both sides.
fn sheet_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})([./])(\d{1,2})([./])(\d{4})").expect("valid sheet date regex")
    })
}

/// Parse the date prefix of an attendance cell.
///
/// Accepts `01.09.2024`, `1.9.2024`, `01/09/2024` and anything that starts
/// with one of those (a trailing time such as `01.09.2024 08:30` is ignored).
/// Returns `None` for other shapes and for impossible dates like `31.02.2024`.
///
/// # Examples
///
/// ```
/// use attendance_core::dates::parse_sheet_date;
/// use chrono::NaiveDate;
///
/// assert_eq!(parse_sheet_date("1.9.2024"), NaiveDate::from_ymd_opt(2024, 9, 1));
/// assert_eq!(parse_sheet_date("02/09/2024"), NaiveDate::from_ymd_opt(2024, 9, 2));
/// assert_eq!(parse_sheet_date("2024-09-01"), None);
/// ```
pub fn parse_sheet_date(cell: &str) -> Option<NaiveDate> {
    let caps = sheet_date_regex().captures(cell.trim())?;
    if caps[2] != caps[4] {
        return None;
    }

    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[3].parse().ok()?;
    let year: i32 = caps[5].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day);
    if date.is_none() {
        debug!("Ignoring impossible sheet date \"{}\"", cell.trim());
    }
    date
}

/// Parse a `YYYY-MM-DD` string, as used by filter arguments.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Short `DD.MM` label used on time-series axes.
pub fn format_short(date: NaiveDate) -> String {
    date.format("%d.%m").to_string()
}

// ── Relative periods ──────────────────────────────────────────────────────────

/// Number of days covered by a relative period name (`7d`, `30d`, `90d`).
pub fn period_days(period: &str) -> Option<i64> {
    match period.trim() {
        "7d" => Some(7),
        "30d" => Some(30),
        "90d" => Some(90),
        _ => None,
    }
}

/// Inclusive `[start, today]` window for a relative period name.
pub fn period_window(period: &str, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let days = period_days(period)?;
    Some((today - Duration::days(days), today))
}
