//! Pointer position to timetable time.
//!
//! Dragging and resizing both read the hour gridline under the relevant edge
//! of the block, turn the offset inside that hour into minutes and snap to
//! five-minute marks. Drops that land outside the usable window snap back
//! without touching any data.

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::models::commit::CommitRequest;
use crate::models::entry::ScheduleEntry;
use crate::services::layout::HourLine;
use crate::utils::date::day_key;

/// Height given to the last gridline, which has no successor to measure against
pub const LAST_LINE_HEIGHT: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridTime {
    pub hour: u32,
    pub minute: u32,
}

impl GridTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn to_time(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }

    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

/// Which edge of the block decides the time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragEdge {
    /// Moving: the top edge becomes the new start
    Start,
    /// Resizing: the bottom edge becomes the new end
    End,
}

/// A gridline with the vertical extent of its hour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub hour: u32,
    pub top: f32,
    pub height: f32,
}

pub fn grid_lines(scale: &[HourLine]) -> Vec<GridLine> {
    scale
        .iter()
        .enumerate()
        .map(|(i, line)| GridLine {
            hour: line.hour,
            top: line.top,
            height: scale
                .get(i + 1)
                .map(|next| next.top - line.top)
                .unwrap_or(LAST_LINE_HEIGHT),
        })
        .collect()
}

/// Minutes past the hour for a pointer inside a gridline's extent.
///
/// `None` when the pointer is outside `[0, 60]`.
pub fn minute_offset(pointer_y: f32, line_top: f32, line_height: f32) -> Option<u32> {
    if line_height <= 0.0 {
        return None;
    }
    let minute = (((pointer_y - line_top) / line_height) * 59.0).floor();
    if !(0.0..=60.0).contains(&minute) {
        return None;
    }
    Some(minute as u32)
}

/// Round to the closest five-minute mark.
///
/// Rounding up to a full hour moves to the next hour; `None` when that would
/// go past 23.
pub fn round5(hour: u32, minute: u32) -> Option<GridTime> {
    if hour > 23 {
        return None;
    }
    let closest = (minute * 2 + 5) / 10 * 5;
    if closest > 59 {
        if hour + 1 > 23 {
            return None;
        }
        return Some(GridTime::new(hour + 1, 0));
    }
    Some(GridTime::new(hour, closest))
}

/// The closest gridline at or above `y`, with its index
pub fn line_at(lines: &[GridLine], y: f32) -> Option<(usize, GridLine)> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.top <= y)
        .last()
        .map(|(i, line)| (i, *line))
}

/// Quantized time for a block edge at `y`.
///
/// Past the last gridline the time is that line's hour, on the hour.
pub fn time_at(lines: &[GridLine], y: f32) -> Option<GridTime> {
    let (idx, line) = line_at(lines, y)?;
    if idx + 1 == lines.len() {
        return Some(GridTime::new(line.hour, 0));
    }
    let minute = minute_offset(y, line.top, line.height)?;
    round5(line.hour, minute)
}

/// Y position of the relevant edge of a block being dragged or resized
pub fn edge_position(edge: DragEdge, block_top: f32, block_height: f32) -> f32 {
    match edge {
        DragEdge::Start => block_top,
        DragEdge::End => block_top + block_height,
    }
}

/// Why a drop did not produce a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The pointer was not over a usable minute
    NoTime,
    /// Hour 0 is never a valid target
    Midnight,
    BeforeDayStart,
    CrossesMidnight,
    EndBeforeStart,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    Commit(CommitRequest),
    SnapBack(RejectReason),
}

/// Everything needed to judge a drop
#[derive(Debug, Clone)]
pub struct DropTarget<'a> {
    pub entry: &'a ScheduleEntry,
    pub day: NaiveDate,
    pub edge: DragEdge,
    pub time: Option<GridTime>,
    pub day_start_hour: u32,
    /// Last hour of the day window; below 24 means the day ends before midnight
    pub window_end_hour: u32,
    pub shift_later: bool,
}

pub fn evaluate_drop(target: &DropTarget<'_>) -> DropOutcome {
    let Some(time) = target.time else {
        return DropOutcome::SnapBack(RejectReason::NoTime);
    };
    if time.hour == 0 {
        return DropOutcome::SnapBack(RejectReason::Midnight);
    }
    if time.hour < target.day_start_hour {
        return DropOutcome::SnapBack(RejectReason::BeforeDayStart);
    }
    let Some(clock) = time.to_time() else {
        return DropOutcome::SnapBack(RejectReason::NoTime);
    };

    let entry = target.entry;
    let (start, end) = match target.edge {
        DragEdge::Start => {
            let start = target.day.and_time(clock);
            (start, start + Duration::minutes(entry.duration))
        }
        DragEdge::End => (entry.start(), target.day.and_time(clock)),
    };

    if end < start {
        return DropOutcome::SnapBack(RejectReason::EndBeforeStart);
    }
    let midnight = (target.day + Duration::days(1)).and_time(NaiveTime::MIN);
    if target.window_end_hour < 24 && end > midnight {
        return DropOutcome::SnapBack(RejectReason::CrossesMidnight);
    }
    if start == entry.start() && end == entry.end() {
        return DropOutcome::SnapBack(RejectReason::Unchanged);
    }

    DropOutcome::Commit(CommitRequest {
        entry_id: entry.id.clone(),
        day: day_key(target.day),
        start,
        end,
        shift_later: target.shift_later,
        previous_start: entry.start(),
        previous_end: entry.end(),
    })
}

/// Judge typed-in start and end times with the same guards as a drop.
///
/// `target.time` is the new start; `target.edge` is ignored.
pub fn evaluate_retime(target: &DropTarget<'_>, end: GridTime) -> DropOutcome {
    let entry = target.entry;
    let start = match evaluate_drop(&DropTarget {
        edge: DragEdge::Start,
        ..target.clone()
    }) {
        DropOutcome::Commit(request) => request.start,
        DropOutcome::SnapBack(RejectReason::Unchanged) => entry.start(),
        rejected => return rejected,
    };

    let mut moved = entry.clone();
    moved.reschedule(start, start + Duration::minutes(entry.duration));
    let resized = evaluate_drop(&DropTarget {
        entry: &moved,
        edge: DragEdge::End,
        time: Some(end),
        ..target.clone()
    });

    let (start, end) = match resized {
        DropOutcome::Commit(request) => (request.start, request.end),
        DropOutcome::SnapBack(RejectReason::Unchanged) => (moved.start(), moved.end()),
        rejected => return rejected,
    };
    if start == entry.start() && end == entry.end() {
        return DropOutcome::SnapBack(RejectReason::Unchanged);
    }

    DropOutcome::Commit(CommitRequest {
        entry_id: entry.id.clone(),
        day: day_key(target.day),
        start,
        end,
        shift_later: target.shift_later,
        previous_start: entry.start(),
        previous_end: entry.end(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::EntryType;
    use test_case::test_case;

    #[test_case(10, 2 => Some(GridTime::new(10, 0)) ; "rounds down below half")]
    #[test_case(10, 3 => Some(GridTime::new(10, 5)) ; "rounds up from half")]
    #[test_case(10, 57 => Some(GridTime::new(10, 55)) ; "stays in hour")]
    #[test_case(10, 58 => Some(GridTime::new(11, 0)) ; "rolls into next hour")]
    #[test_case(23, 58 => None ; "rejects roll past 23")]
    #[test_case(23, 57 => Some(GridTime::new(23, 55)) ; "last hour still usable")]
    #[test_case(24, 0 => None ; "hour out of range")]
    fn test_round5(hour: u32, minute: u32) -> Option<GridTime> {
        round5(hour, minute)
    }

    #[test_case(100.0, 100.0, 60.0 => Some(0) ; "top of the hour")]
    #[test_case(130.0, 100.0, 60.0 => Some(29) ; "half way")]
    #[test_case(160.0, 100.0, 60.0 => Some(59) ; "bottom edge")]
    #[test_case(99.0, 100.0, 60.0 => None ; "above the line")]
    #[test_case(163.0, 100.0, 60.0 => None ; "far below")]
    #[test_case(120.0, 100.0, 0.0 => None ; "degenerate line")]
    fn test_minute_offset(y: f32, top: f32, height: f32) -> Option<u32> {
        minute_offset(y, top, height)
    }

    fn lines() -> Vec<GridLine> {
        grid_lines(&[
            HourLine { hour: 9, top: 0.0 },
            HourLine { hour: 10, top: 120.0 },
            HourLine { hour: 11, top: 240.0 },
        ])
    }

    #[test]
    fn test_time_at_uses_line_above_pointer() {
        let lines = lines();
        assert_eq!(lines[2].height, LAST_LINE_HEIGHT);
        assert_eq!(time_at(&lines, 60.0), Some(GridTime::new(9, 30)));
        assert_eq!(time_at(&lines, 125.0), Some(GridTime::new(10, 0)));
        assert_eq!(time_at(&lines, 500.0), Some(GridTime::new(11, 0)));
        assert_eq!(time_at(&lines, -5.0), None);
    }

    #[test]
    fn test_edge_position() {
        assert_eq!(edge_position(DragEdge::Start, 40.0, 100.0), 40.0);
        assert_eq!(edge_position(DragEdge::End, 40.0, 100.0), 140.0);
    }

    fn talk() -> ScheduleEntry {
        let start = NaiveDate::from_ymd_opt(2024, 5, 13)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        ScheduleEntry::new("8", EntryType::Contribution, "Talk", start, 45).unwrap()
    }

    fn target(entry: &ScheduleEntry, edge: DragEdge, time: Option<GridTime>) -> DropTarget<'_> {
        DropTarget {
            entry,
            day: entry.start_date.date,
            edge,
            time,
            day_start_hour: 8,
            window_end_hour: 18,
            shift_later: false,
        }
    }

    #[test]
    fn test_move_keeps_duration() {
        let entry = talk();
        let outcome = evaluate_drop(&target(&entry, DragEdge::Start, Some(GridTime::new(14, 15))));
        let DropOutcome::Commit(request) = outcome else {
            panic!("expected commit, got {:?}", outcome);
        };
        assert_eq!(request.start.time(), NaiveTime::from_hms_opt(14, 15, 0).unwrap());
        assert_eq!(request.end.time(), NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert_eq!(request.previous_start, entry.start());
        assert_eq!(request.day, "20240513");
    }

    #[test]
    fn test_resize_keeps_start() {
        let entry = talk();
        let outcome = evaluate_drop(&target(&entry, DragEdge::End, Some(GridTime::new(11, 30))));
        let DropOutcome::Commit(request) = outcome else {
            panic!("expected commit, got {:?}", outcome);
        };
        assert_eq!(request.start, entry.start());
        assert_eq!(request.end.time(), NaiveTime::from_hms_opt(11, 30, 0).unwrap());
    }

    #[test_case(None => RejectReason::NoTime ; "no minute")]
    #[test_case(Some(GridTime::new(0, 30)) => RejectReason::Midnight ; "hour zero")]
    #[test_case(Some(GridTime::new(7, 0)) => RejectReason::BeforeDayStart ; "before day start")]
    #[test_case(Some(GridTime::new(23, 30)) => RejectReason::CrossesMidnight ; "runs past midnight")]
    #[test_case(Some(GridTime::new(10, 0)) => RejectReason::Unchanged ; "same place")]
    fn test_move_rejections(time: Option<GridTime>) -> RejectReason {
        let entry = talk();
        match evaluate_drop(&target(&entry, DragEdge::Start, time)) {
            DropOutcome::SnapBack(reason) => reason,
            DropOutcome::Commit(request) => panic!("unexpected commit {:?}", request),
        }
    }

    #[test]
    fn test_resize_above_start_rejected() {
        let entry = talk();
        assert_eq!(
            evaluate_drop(&target(&entry, DragEdge::End, Some(GridTime::new(9, 0)))),
            DropOutcome::SnapBack(RejectReason::EndBeforeStart)
        );
    }

    #[test]
    fn test_late_window_allows_midnight_crossing() {
        let entry = talk();
        let mut t = target(&entry, DragEdge::Start, Some(GridTime::new(23, 30)));
        t.window_end_hour = 24;
        assert!(matches!(evaluate_drop(&t), DropOutcome::Commit(_)));
    }

    #[test]
    fn test_retime_sets_both_edges() {
        let entry = talk();
        let t = target(&entry, DragEdge::Start, Some(GridTime::new(13, 0)));
        let DropOutcome::Commit(request) = evaluate_retime(&t, GridTime::new(14, 30)) else {
            panic!("expected commit");
        };
        assert_eq!(request.start.time(), NaiveTime::from_hms_opt(13, 0, 0).unwrap());
        assert_eq!(request.end.time(), NaiveTime::from_hms_opt(14, 30, 0).unwrap());
        assert_eq!(request.previous_end, entry.end());
    }

    #[test]
    fn test_retime_only_end() {
        let entry = talk();
        let t = target(&entry, DragEdge::Start, Some(GridTime::new(10, 0)));
        let DropOutcome::Commit(request) = evaluate_retime(&t, GridTime::new(11, 0)) else {
            panic!("expected commit");
        };
        assert_eq!(request.start, entry.start());
        assert_eq!(request.end.time(), NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }

    #[test]
    fn test_retime_guards() {
        let entry = talk();
        let same = target(&entry, DragEdge::Start, Some(GridTime::new(10, 0)));
        assert_eq!(
            evaluate_retime(&same, GridTime::new(10, 45)),
            DropOutcome::SnapBack(RejectReason::Unchanged)
        );
        let early = target(&entry, DragEdge::Start, Some(GridTime::new(6, 0)));
        assert_eq!(
            evaluate_retime(&early, GridTime::new(7, 0)),
            DropOutcome::SnapBack(RejectReason::BeforeDayStart)
        );
        assert_eq!(
            evaluate_retime(&same, GridTime::new(9, 0)),
            DropOutcome::SnapBack(RejectReason::EndBeforeStart)
        );
    }
}
