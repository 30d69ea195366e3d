//! Day layout strategies.
//!
//! A strategy turns one day's entries into a [`DayLayout`]: vertical pixel
//! ranges, column assignments grouped by overlap, the hour scale and the
//! whole-day row. The drawer turns placements into rectangles with
//! [`geometry::column_geometry`].

mod checkpoints;
pub mod flatten;
pub mod geometry;
mod poster;
mod sweep;

use crate::models::entry::{sort_entries, DayEntries, ScheduleEntry};
use crate::models::view::LayoutKind;

pub use checkpoints::{Checkpoint, CheckpointTable, PointKind};
pub use poster::PosterLayout;
pub use sweep::{CompactLayout, ProportionalLayout, RoomLayout};

/// Fixed page metrics shared by every layout
pub mod defaults {
    pub const TOP_MARGIN: f32 = 30.0;
    pub const BOTTOM_MARGIN: f32 = 40.0;
    pub const LEFT_MARGIN: f32 = 55.0;
    pub const RIGHT_MARGIN: f32 = 5.0;
    pub const BLOCK_MARGIN: f32 = 4.0;
    /// Minutes per sweep step
    pub const RESOLUTION: u32 = 1;
    /// Posters longer than this many hours go to the whole-day row
    pub const WHOLEDAY_HOURS: i64 = 7;
    pub const MIN_CONTRIB_HEIGHT: f32 = 20.0;
    /// Extra height of blocks that continue past midnight
    pub const NEXT_DAY_OVERHANG: f32 = 20.0;
}

/// Inputs that are not part of the day data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Adds an empty hour before the first entry and a trailing hour line
    pub management_mode: bool,
    /// Window used when the day has too few entries to derive one
    pub day_start_hour: u32,
    pub day_end_hour: u32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            management_mode: false,
            day_start_hour: 8,
            day_end_hour: 17,
        }
    }
}

/// Placement of one block in the day, in layout pixels
#[derive(Debug, Clone, PartialEq)]
pub struct BlockPlacement {
    pub id: String,
    pub start: f32,
    pub end: f32,
    /// Column index inside the block's group
    pub assigned: usize,
    pub group: usize,
    /// The entry continues into the next day
    pub unfinished: bool,
    /// The block was stretched to its minimum height
    pub collapsed: bool,
}

impl BlockPlacement {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: 0.0,
            end: 0.0,
            assigned: 0,
            group: 0,
            unfinished: false,
            collapsed: false,
        }
    }

    /// Drawn height of the rectangle
    pub fn height(&self) -> f32 {
        (self.end - self.start - 3.0).max(0.0)
    }
}

/// Blocks linked by overlap; they share one column split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGroup {
    /// Indices into [`DayLayout::blocks`]
    pub blocks: Vec<usize>,
    pub columns: usize,
}

/// One hour gridline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourLine {
    pub hour: u32,
    pub top: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DayLayout {
    /// Height of the laid out content, margins excluded
    pub height: f32,
    pub grid: Vec<HourLine>,
    pub blocks: Vec<BlockPlacement>,
    pub groups: Vec<BlockGroup>,
    pub whole_day: Vec<String>,
    /// Column captions, only the room layout fills it
    pub header: Vec<String>,
}

impl DayLayout {
    pub fn columns_for(&self, block: &BlockPlacement) -> usize {
        self.groups
            .get(block.group)
            .map(|g| g.columns.max(1))
            .unwrap_or(1)
    }

    pub fn block(&self, id: &str) -> Option<&BlockPlacement> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Largest column count of any group
    pub fn max_columns(&self) -> usize {
        self.groups.iter().map(|g| g.columns).max().unwrap_or(0)
    }
}

pub trait LayoutStrategy: Send + Sync {
    fn kind(&self) -> LayoutKind;

    fn draw_day(&self, entries: &DayEntries, options: &LayoutOptions) -> DayLayout;

    /// Whether block labels should mention the room
    fn shows_room(&self) -> bool {
        true
    }
}

/// Holds one instance of each strategy and the current selection
pub struct LayoutChooser {
    current: LayoutKind,
    compact: CompactLayout,
    proportional: ProportionalLayout,
    room: RoomLayout,
    poster: PosterLayout,
}

impl LayoutChooser {
    pub fn new(current: LayoutKind) -> Self {
        Self {
            current,
            compact: CompactLayout,
            proportional: ProportionalLayout,
            room: RoomLayout,
            poster: PosterLayout,
        }
    }

    pub fn set(&mut self, kind: LayoutKind) {
        self.current = kind;
    }

    pub fn current_kind(&self) -> LayoutKind {
        self.current
    }

    pub fn get(&self) -> &dyn LayoutStrategy {
        self.strategy(self.current)
    }

    pub fn strategy(&self, kind: LayoutKind) -> &dyn LayoutStrategy {
        match kind {
            LayoutKind::Compact => &self.compact,
            LayoutKind::Proportional => &self.proportional,
            LayoutKind::Room => &self.room,
            LayoutKind::Poster => &self.poster,
        }
    }
}

impl Default for LayoutChooser {
    fn default() -> Self {
        Self::new(LayoutKind::Compact)
    }
}

/// Entries of a day in walk order
pub(crate) fn ordered_entries(entries: &DayEntries) -> Vec<&ScheduleEntry> {
    let mut ordered: Vec<&ScheduleEntry> = entries.values().collect();
    sort_entries(&mut ordered);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::EntryType;
    use chrono::NaiveDate;

    fn entry(id: &str, h: u32, m: u32, duration: i64) -> ScheduleEntry {
        let start = NaiveDate::from_ymd_opt(2024, 5, 13)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        ScheduleEntry::new(id, EntryType::Contribution, format!("Talk {}", id), start, duration).unwrap()
    }

    #[test]
    fn test_chooser_switches_strategy() {
        let mut chooser = LayoutChooser::default();
        assert_eq!(chooser.get().kind(), LayoutKind::Compact);
        chooser.set(LayoutKind::Room);
        assert_eq!(chooser.get().kind(), LayoutKind::Room);
        assert!(!chooser.get().shows_room());
        assert!(chooser.strategy(LayoutKind::Proportional).shows_room());
    }

    #[test]
    fn test_every_strategy_handles_empty_day() {
        let chooser = LayoutChooser::default();
        let options = LayoutOptions::default();
        for kind in LayoutKind::ALL {
            let layout = chooser.strategy(kind).draw_day(&DayEntries::new(), &options);
            assert!(layout.blocks.is_empty(), "{} produced blocks", kind);
            assert!(layout.groups.is_empty());
        }
    }

    #[test]
    fn test_ordered_entries_numeric() {
        let mut day = DayEntries::new();
        for e in [entry("10", 9, 0, 10), entry("9", 9, 0, 10), entry("100", 9, 0, 10)] {
            day.insert(e.id.clone(), e);
        }
        let ids: Vec<&str> = ordered_entries(&day).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["9", "10", "100"]);
    }
}
