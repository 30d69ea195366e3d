//! Detail level handling: sessions replaced by their contents.

use crate::models::entry::DayEntries;
use crate::models::view::DetailLevel;

/// Entries to lay out for the given detail level.
///
/// At contribution level every non-poster session with contents is replaced
/// by its children. Children take the session colors, breaks keep their own.
/// Poster sessions and empty sessions stay as they are.
pub fn flatten_day(day: &DayEntries, detail: DetailLevel) -> DayEntries {
    if detail == DetailLevel::Session {
        return day.clone();
    }

    let mut flat = DayEntries::new();
    for (id, entry) in day {
        if !(entry.is_session() && !entry.is_poster && !entry.entries.is_empty()) {
            flat.insert(id.clone(), entry.clone());
            continue;
        }

        for (child_id, child) in &entry.entries {
            let mut child = child.clone();
            if !child.is_break() {
                child.color = entry.color.clone();
                child.text_color = entry.text_color.clone();
            }
            if child.session_id.is_none() {
                child.session_id = entry.session_id.clone();
                child.session_slot_id = entry.session_slot_id.clone();
            }
            flat.insert(child_id.clone(), child);
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{EntryType, ScheduleEntry};
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 13)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn session_with_children(poster: bool) -> ScheduleEntry {
        let mut session = ScheduleEntry::new("s1", EntryType::Session, "Tracking", at(9, 0), 60).unwrap();
        session.color = Some("#112233".to_string());
        session.text_color = Some("#ffffff".to_string());
        session.is_poster = poster;
        session.session_id = Some("1".to_string());

        let talk = ScheduleEntry::new("c1", EntryType::Contribution, "Vertexing", at(9, 0), 30).unwrap();
        let mut pause = ScheduleEntry::new("b1", EntryType::Break, "Pause", at(9, 30), 10).unwrap();
        pause.color = Some("#90c0f0".to_string());
        session.entries.insert(talk.id.clone(), talk);
        session.entries.insert(pause.id.clone(), pause);
        session
    }

    #[test]
    fn test_contribution_level_replaces_session() {
        let mut day = DayEntries::new();
        day.insert("s1".to_string(), session_with_children(false));

        let flat = flatten_day(&day, DetailLevel::Contribution);
        assert!(!flat.contains_key("s1"));
        assert_eq!(flat["c1"].color.as_deref(), Some("#112233"));
        assert_eq!(flat["c1"].session_id.as_deref(), Some("1"));
        assert_eq!(flat["b1"].color.as_deref(), Some("#90c0f0"));
    }

    #[test]
    fn test_poster_and_session_level_untouched() {
        let mut day = DayEntries::new();
        day.insert("s1".to_string(), session_with_children(true));

        assert_eq!(flatten_day(&day, DetailLevel::Contribution), day);

        day.insert("s1".to_string(), session_with_children(false));
        assert_eq!(flatten_day(&day, DetailLevel::Session), day);
    }

    #[test]
    fn test_empty_session_keeps_row() {
        let mut day = DayEntries::new();
        let empty = ScheduleEntry::new("s2", EntryType::Session, "Empty", at(11, 0), 30).unwrap();
        day.insert("s2".to_string(), empty);
        assert!(flatten_day(&day, DetailLevel::Contribution).contains_key("s2"));
    }
}
