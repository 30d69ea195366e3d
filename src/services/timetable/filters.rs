// Entry filters
// Session and room filters applied before a day is laid out

use std::collections::BTreeSet;

use crate::models::entry::{DayEntries, ScheduleEntry};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilters {
    /// Session ids to keep; entries outside any session always pass
    pub sessions: Option<BTreeSet<String>>,
    /// Room names to keep; entries without a room fail an active room filter
    pub rooms: Option<BTreeSet<String>>,
}

impl EntryFilters {
    pub fn is_active(&self) -> bool {
        self.sessions.is_some() || self.rooms.is_some()
    }

    pub fn clear(&mut self) {
        self.sessions = None;
        self.rooms = None;
    }

    pub fn accepts(&self, entry: &ScheduleEntry) -> bool {
        if let (Some(sessions), Some(session)) = (&self.sessions, &entry.session_id) {
            if !sessions.contains(session) {
                return false;
            }
        }
        if let Some(rooms) = &self.rooms {
            match entry.room.as_deref() {
                Some(room) if rooms.contains(room) => {}
                _ => return false,
            }
        }
        true
    }

    pub fn apply(&self, day: &DayEntries) -> DayEntries {
        if !self.is_active() {
            return day.clone();
        }
        day.iter()
            .filter(|(_, entry)| self.accepts(entry))
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::EntryType;
    use chrono::NaiveDate;

    fn entry(id: &str, session: Option<&str>, room: Option<&str>) -> ScheduleEntry {
        let start = NaiveDate::from_ymd_opt(2024, 5, 13)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut e = ScheduleEntry::new(id, EntryType::Contribution, id, start, 20).unwrap();
        e.session_id = session.map(str::to_string);
        e.room = room.map(str::to_string);
        e
    }

    fn day() -> DayEntries {
        [
            entry("1", Some("s1"), Some("A")),
            entry("2", Some("s2"), Some("B")),
            entry("3", None, None),
        ]
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect()
    }

    #[test]
    fn test_inactive_filter_keeps_everything() {
        assert_eq!(EntryFilters::default().apply(&day()).len(), 3);
    }

    #[test]
    fn test_session_filter_keeps_unsessioned_entries() {
        let filters = EntryFilters {
            sessions: Some(["s1".to_string()].into()),
            rooms: None,
        };
        let kept: Vec<String> = filters.apply(&day()).into_keys().collect();
        assert_eq!(kept, vec!["1", "3"]);
    }

    #[test]
    fn test_room_filter_drops_roomless_entries() {
        let mut filters = EntryFilters {
            sessions: None,
            rooms: Some(["B".to_string()].into()),
        };
        let kept: Vec<String> = filters.apply(&day()).into_keys().collect();
        assert_eq!(kept, vec!["2"]);

        filters.clear();
        assert!(!filters.is_active());
    }
}
