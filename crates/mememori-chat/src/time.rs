//! Local calendar helpers
//!
//! Days and clock labels use a fixed UTC offset from configuration rather than the
//! host time zone, so every client groups messages the same way.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc, Weekday};

/// Calendar day of `at` in the local offset
pub fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

pub fn is_same_day(a: DateTime<Utc>, b: DateTime<Utc>, offset: FixedOffset) -> bool {
    local_day(a, offset) == local_day(b, offset)
}

/// `HH:MM` in the local offset
pub fn format_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H:%M").to_string()
}

/// Date separator label, e.g. `2024年1月1日(月)`
pub fn format_date_label(day: NaiveDate) -> String {
    format!(
        "{}年{}月{}日({})",
        day.year(),
        day.month(),
        day.day(),
        weekday_label(day.weekday())
    )
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}
