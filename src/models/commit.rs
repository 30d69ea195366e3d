// Commit model
// Requests sent when a block is dropped or resized, and what comes back

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::entry::{DayEntries, ScheduleEntry};

/// New interval for an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub entry_id: String,
    /// Day key the entry is shown on
    pub day: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Move later entries of the day by the same amount
    pub shift_later: bool,
    /// Interval before the change, used for undo
    pub previous_start: NaiveDateTime,
    pub previous_end: NaiveDateTime,
}

impl CommitRequest {
    /// The request that restores the previous interval
    pub fn inverse(&self) -> CommitRequest {
        CommitRequest {
            entry_id: self.entry_id.clone(),
            day: self.day.clone(),
            start: self.previous_start,
            end: self.previous_end,
            shift_later: self.shift_later,
            previous_start: self.start,
            previous_end: self.end,
        }
    }

    pub fn undo_caption(&self) -> String {
        if self.shift_later {
            "Undo move (later entries shifted)".to_string()
        } else {
            "Undo move".to_string()
        }
    }
}

/// Server-confirmed result of a commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum CommitResponse {
    /// Only the moved entry changed
    Entry(ScheduleEntry),
    /// Several entries of the day changed
    Day { day: String, entries: DayEntries },
}

/// Request to move a contribution or break into a session slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToSession {
    pub entry_id: String,
    pub day: String,
    pub session_id: String,
    pub session_slot_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_inverse_restores_previous() {
        let at = |h| {
            NaiveDate::from_ymd_opt(2024, 5, 13)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        let request = CommitRequest {
            entry_id: "5".to_string(),
            day: "20240513".to_string(),
            start: at(10),
            end: at(11),
            shift_later: false,
            previous_start: at(9),
            previous_end: at(10),
        };
        let undo = request.inverse();
        assert_eq!(undo.start, at(9));
        assert_eq!(undo.end, at(10));
        assert_eq!(undo.inverse(), request);
    }
}
