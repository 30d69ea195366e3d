// Test fixtures - reusable timetable and booking data
// Shared by the integration tests

#![allow(dead_code)]

use std::cell::RefCell;

use chrono::{NaiveDate, NaiveDateTime};
use conference_timetable::models::booking::Booking;
use conference_timetable::models::entry::{DayEntries, EntryType, ScheduleEntry, TimetableData};
use conference_timetable::services::bookings::Launcher;

pub const DAY: &str = "20240513";

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 13).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    date().and_hms_opt(hour, minute, 0).unwrap()
}

pub fn contribution(id: &str, hour: u32, minute: u32, duration: i64) -> ScheduleEntry {
    ScheduleEntry::new(id, EntryType::Contribution, format!("Talk {}", id), at(hour, minute), duration).unwrap()
}

pub fn coffee_break(id: &str, hour: u32, minute: u32, duration: i64) -> ScheduleEntry {
    ScheduleEntry::new(id, EntryType::Break, "Coffee", at(hour, minute), duration).unwrap()
}

pub fn session(id: &str, session_id: &str, slot_id: &str, hour: u32, duration: i64) -> ScheduleEntry {
    let mut entry = ScheduleEntry::new(id, EntryType::Session, format!("Session {}", session_id), at(hour, 0), duration).unwrap();
    entry.session_id = Some(session_id.to_string());
    entry.session_slot_id = Some(slot_id.to_string());
    entry
}

pub fn day(entries: Vec<ScheduleEntry>) -> DayEntries {
    entries.into_iter().map(|e| (e.id.clone(), e)).collect()
}

/// One day: a morning session, two parallel talks, a break and a late talk
pub fn sample_timetable() -> TimetableData {
    let mut plenary = session("s1", "1", "1", 9, 60);
    let child = contribution("c1", 9, 0, 30);
    plenary.entries.insert(child.id.clone(), child);

    let mut data = TimetableData::new();
    data.insert(
        DAY.to_string(),
        day(vec![
            plenary,
            contribution("t1", 10, 0, 30),
            contribution("t2", 10, 15, 30),
            coffee_break("b1", 11, 0, 20),
            contribution("t3", 14, 0, 45),
        ]),
    );
    data
}

pub fn startable(id: &str, booking_type: &str, batch: bool) -> Booking {
    let mut booking = Booking::new(id, booking_type);
    booking.has_start = true;
    booking.has_stop = true;
    booking.can_be_started = true;
    booking.has_start_stop_all = batch;
    booking
}

/// Remembers every URL it was asked to open
#[derive(Default)]
pub struct RecordingLauncher {
    pub opened: RefCell<Vec<(String, String)>>,
}

impl Launcher for RecordingLauncher {
    fn open(&self, target: &str, url: &str) -> anyhow::Result<()> {
        self.opened.borrow_mut().push((target.to_string(), url.to_string()));
        Ok(())
    }
}
