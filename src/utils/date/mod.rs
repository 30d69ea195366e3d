// Date utility functions
// Form date parsing and event-timezone comparisons

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Date-time format used by booking forms, e.g. `13/05/2024 09:30`
pub const FORM_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";

pub fn parse_form_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), FORM_DATETIME_FORMAT).ok()
}

pub fn format_form_datetime(value: NaiveDateTime) -> String {
    value.format(FORM_DATETIME_FORMAT).to_string()
}

/// Current wall-clock time in the event timezone
pub fn now_in(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

/// Whether a wall-clock time in `tz` lies before `now` (given in UTC).
/// Times that do not exist in `tz` (DST gaps) count as not before.
pub fn before(value: NaiveDateTime, tz: Tz, now: chrono::DateTime<Utc>) -> bool {
    match tz.from_local_datetime(&value).earliest() {
        Some(local) => local.with_timezone(&Utc) < now,
        None => false,
    }
}

pub fn before_now(value: NaiveDateTime, tz: Tz) -> bool {
    before(value, tz, Utc::now())
}

/// Day key used by the timetable data, e.g. `20240513`
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y%m%d").ok()
}

/// Long caption for a day tab, e.g. `Monday 13 May 2024`
pub fn day_caption(date: NaiveDate) -> String {
    date.format("%A %-d %B %Y").to_string()
}
