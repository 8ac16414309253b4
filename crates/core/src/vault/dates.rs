//! Date parsing for daily notes.

use chrono::{Duration, NaiveDate};

/// Strict `YYYY-MM-DD`.
pub fn is_valid_date(s: &str) -> bool {
    parse_iso_date(s).is_some()
}

pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// `today`, `tomorrow` or `yesterday` relative to `today`.
pub fn parse_date_keyword(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    match s.trim().to_ascii_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        "yesterday" => Some(today - Duration::days(1)),
        _ => None,
    }
}

/// An ISO date or a relative keyword.
pub fn resolve_date(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    parse_iso_date(s.trim()).or_else(|| parse_date_keyword(s, today))
}

/// Object ID of the daily note for `date`.
pub fn daily_note_id(daily_dir: &str, date: NaiveDate) -> String {
    let dir = daily_dir.trim_matches('/');
    let day = date.format("%Y-%m-%d");
    if dir.is_empty() { day.to_string() } else { format!("{dir}/{day}") }
}

/// `Saturday, February 14, 2026`
pub fn friendly_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// Initial content of a newly created daily note.
pub fn daily_note_template(date: NaiveDate) -> String {
    format!("---\ntype: date\n---\n\n# {}\n\n", friendly_date(date))
}
