// Schedule entry model
// Sessions, contributions and breaks as delivered by the day-entry fetch

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Entries of one day keyed by entry id
pub type DayEntries = BTreeMap<String, ScheduleEntry>;

/// Whole timetable keyed by day (`YYYYMMDD`)
pub type TimetableData = BTreeMap<String, DayEntries>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    Session,
    Contribution,
    Break,
}

/// Date and time-of-day pair in the event timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryDateTime {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl EntryDateTime {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    pub fn to_naive(self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self {
            date: dt.date(),
            time: dt.time(),
        }
    }

    /// Minutes since midnight, seconds dropped
    pub fn minute_of_day(&self) -> u32 {
        use chrono::Timelike;
        self.time.hour() * 60 + self.time.minute()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Convener {
    pub name: String,
    #[serde(default)]
    pub display_order_key: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: String,
    pub entry_type: EntryType,
    pub start_date: EntryDateTime,
    pub end_date: EntryDateTime,
    /// Minutes
    pub duration: i64,
    pub title: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub entries: DayEntries,
    #[serde(default)]
    pub is_poster: bool,
    #[serde(default)]
    pub slot_title: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_slot_id: Option<String>,
    #[serde(default)]
    pub session_code: Option<String>,
    #[serde(default)]
    pub presenters: Vec<String>,
    #[serde(default)]
    pub conveners: Vec<Convener>,
    #[serde(default)]
    pub friendly_id: Option<String>,
    #[serde(default)]
    pub schedule_entry_id: Option<i64>,
    #[serde(default)]
    pub contribution_id: Option<String>,
}

impl ScheduleEntry {
    /// Create a new entry with required fields
    ///
    /// The end is derived from `start + duration`.
    ///
    /// # Examples
    /// ```
    /// use conference_timetable::models::entry::{EntryType, ScheduleEntry};
    /// use chrono::NaiveDate;
    ///
    /// let start = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap().and_hms_opt(9, 0, 0).unwrap();
    /// let entry = ScheduleEntry::new("c1", EntryType::Contribution, "Opening", start, 30).unwrap();
    /// assert_eq!(entry.end_date.time.to_string(), "09:30:00");
    /// ```
    pub fn new(
        id: impl Into<String>,
        entry_type: EntryType,
        title: impl Into<String>,
        start: NaiveDateTime,
        duration_minutes: i64,
    ) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Entry id cannot be empty".to_string());
        }
        if duration_minutes < 0 {
            return Err("Entry duration cannot be negative".to_string());
        }
        let end = start + Duration::minutes(duration_minutes);

        Ok(Self {
            id,
            entry_type,
            start_date: EntryDateTime::from_naive(start),
            end_date: EntryDateTime::from_naive(end),
            duration: duration_minutes,
            title: title.into(),
            color: None,
            text_color: None,
            room: None,
            location: None,
            entries: DayEntries::new(),
            is_poster: false,
            slot_title: None,
            session_id: None,
            session_slot_id: None,
            session_code: None,
            presenters: Vec::new(),
            conveners: Vec::new(),
            friendly_id: None,
            schedule_entry_id: None,
            contribution_id: None,
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start_date.to_naive()
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end_date.to_naive()
    }

    pub fn is_session(&self) -> bool {
        self.entry_type == EntryType::Session
    }

    pub fn is_break(&self) -> bool {
        self.entry_type == EntryType::Break
    }

    /// Day key (`YYYYMMDD`) of the start date
    pub fn day_key(&self) -> String {
        crate::utils::date::day_key(self.start_date.date)
    }

    /// Move the entry to a new interval, updating the stored duration
    pub fn reschedule(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        self.start_date = EntryDateTime::from_naive(start);
        self.end_date = EntryDateTime::from_naive(end);
        self.duration = (end - start).num_minutes();
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Entry id cannot be empty".to_string());
        }
        if self.end() < self.start() {
            return Err(format!("Entry {} ends before it starts", self.id));
        }
        for color in [&self.color, &self.text_color].into_iter().flatten() {
            if !color.starts_with('#') || color.len() != 7 {
                return Err(format!("Color must be in #RRGGBB format: {}", color));
            }
        }
        Ok(())
    }

    /// Session slot key used to keep slots of the same session in a stable column
    pub fn slot_key(&self) -> Option<(String, String)> {
        Some((self.session_id.clone()?, self.session_slot_id.clone()?))
    }
}

/// Ordering used when walking a day.
///
/// Two entries that both carry a session code compare by code; any other
/// pair compares by numeric id, then by plain id. This is not transitive
/// across mixed days, so sort with [`sort_entries`] rather than `sort_by`.
pub fn entry_order(a: &ScheduleEntry, b: &ScheduleEntry) -> Ordering {
    if let (Some(x), Some(y)) = (&a.session_code, &b.session_code) {
        if x != y {
            return x.cmp(y);
        }
    }
    let numeric = |e: &ScheduleEntry| e.id.parse::<i64>().ok();
    numeric(a).cmp(&numeric(b)).then_with(|| a.id.cmp(&b.id))
}

/// Stable insertion sort by [`entry_order`]
pub fn sort_entries(entries: &mut [&ScheduleEntry]) {
    for i in 1..entries.len() {
        let mut j = i;
        while j > 0 && entry_order(entries[j - 1], entries[j]) == Ordering::Greater {
            entries.swap(j - 1, j);
            j -= 1;
        }
    }
}
