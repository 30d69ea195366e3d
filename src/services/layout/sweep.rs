//! Incremental minute sweep shared by the compact, proportional and room layouts.
//!
//! The sweep walks the day window one step at a time. At each step it closes
//! the blocks ending there, draws the hour line, closes the current group when
//! nothing is active, opens the blocks starting there and advances the pixel
//! cursor.

use std::collections::HashMap;

use super::checkpoints::{CheckpointTable, PointKind};
use super::defaults::{NEXT_DAY_OVERHANG, RESOLUTION};
use super::{
    ordered_entries, BlockGroup, BlockPlacement, DayLayout, HourLine, LayoutOptions,
    LayoutStrategy,
};
use crate::models::entry::{DayEntries, ScheduleEntry};
use crate::models::view::LayoutKind;

/// Pixel metrics of a sweep variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SweepMetrics {
    pub px_per_hour: f32,
    /// Advance for a step with nothing active; `None` uses the regular step
    pub px_per_space: Option<f32>,
    pub min_px_per_block: f32,
    /// Every block ending on a step gets the same bottom edge
    pub align_ends: bool,
    /// Hour lines past this hour are not drawn
    pub last_grid_hour: u32,
}

pub(crate) const COMPACT: SweepMetrics = SweepMetrics {
    px_per_hour: 150.0,
    px_per_space: Some(2.0),
    min_px_per_block: 50.0,
    align_ends: true,
    last_grid_hour: u32::MAX,
};

pub(crate) const PROPORTIONAL: SweepMetrics = SweepMetrics {
    px_per_hour: 120.0,
    px_per_space: None,
    min_px_per_block: 25.0,
    align_ends: false,
    last_grid_hour: 24,
};

impl SweepMetrics {
    fn px_step(&self) -> f32 {
        (self.px_per_hour * RESOLUTION as f32 / 60.0).floor()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnMode {
    /// Smallest free column, session slots kept in their column
    Greedy { keep_slots: bool },
    /// One column per room name
    ByRoom,
}

struct SweepState<'a> {
    metrics: SweepMetrics,
    mode: ColumnMode,
    entries: HashMap<&'a str, &'a ScheduleEntry>,
    top: f32,
    active: usize,
    blocks: Vec<BlockPlacement>,
    open: Vec<bool>,
    index: HashMap<String, usize>,
    /// Column slot -> block occupying it
    columns: Vec<Option<usize>>,
    current_group: Vec<usize>,
    groups: Vec<BlockGroup>,
    grid: Vec<HourLine>,
    /// Last column used by each session slot
    slot_columns: HashMap<(String, String), usize>,
    rooms: Vec<String>,
}

impl<'a> SweepState<'a> {
    fn new(metrics: SweepMetrics, mode: ColumnMode, ordered: &[&'a ScheduleEntry]) -> Self {
        let mut rooms: Vec<String> = ordered
            .iter()
            .filter_map(|e| e.room.as_deref())
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        rooms.sort();
        rooms.dedup();

        Self {
            metrics,
            mode,
            entries: ordered.iter().map(|e| (e.id.as_str(), *e)).collect(),
            top: 0.0,
            active: 0,
            blocks: Vec::new(),
            open: Vec::new(),
            index: HashMap::new(),
            columns: Vec::new(),
            current_group: Vec::new(),
            groups: Vec::new(),
            grid: Vec::new(),
            slot_columns: HashMap::new(),
            rooms,
        }
    }

    fn block_for(&mut self, id: &str) -> usize {
        if let Some(idx) = self.index.get(id) {
            return *idx;
        }
        let idx = self.blocks.len();
        self.blocks.push(BlockPlacement::new(id));
        self.open.push(false);
        self.index.insert(id.to_string(), idx);
        idx
    }

    fn room_column(&self, block: usize) -> usize {
        self.entries
            .get(self.blocks[block].id.as_str())
            .and_then(|e| e.room.as_deref())
            .map(str::trim)
            .and_then(|room| self.rooms.iter().position(|r| r == room))
            .unwrap_or(0)
    }

    fn assign(&mut self, block: usize) {
        let col = match self.mode {
            ColumnMode::ByRoom => self.room_column(block),
            ColumnMode::Greedy { .. } => {
                match self.columns.iter().position(Option::is_none) {
                    Some(free) => free,
                    None => {
                        self.columns.push(None);
                        self.columns.len() - 1
                    }
                }
            }
        };
        if let ColumnMode::Greedy { .. } = self.mode {
            self.columns[col] = Some(block);
        }
        self.blocks[block].assigned = col;
    }

    fn release(&mut self, block: usize) {
        if let ColumnMode::Greedy { .. } = self.mode {
            let col = self.blocks[block].assigned;
            if self.columns.get(col).copied().flatten() == Some(block) {
                self.columns[col] = None;
            }
        }
        self.open[block] = false;
        self.active = self.active.saturating_sub(1);
    }

    fn move_to(&mut self, block: usize, col: usize) {
        let old = self.blocks[block].assigned;
        if self.columns.get(old).copied().flatten() == Some(block) {
            self.columns[old] = None;
        }
        self.blocks[block].assigned = col;
        self.columns[col] = Some(block);
        self.remember_slot(block);
    }

    fn remember_slot(&mut self, block: usize) {
        let key = self
            .entries
            .get(self.blocks[block].id.as_str())
            .and_then(|e| e.slot_key());
        if let Some(key) = key {
            self.slot_columns.insert(key, self.blocks[block].assigned);
        }
    }

    /// Keep blocks of the same session slot in the column they used before
    fn reorder_slots(&mut self) {
        for block in self.current_group.clone() {
            let key = match self
                .entries
                .get(self.blocks[block].id.as_str())
                .and_then(|e| e.slot_key())
            {
                Some(key) => key,
                None => continue,
            };

            let preferred = match self.slot_columns.get(&key) {
                Some(col) => *col,
                None => {
                    self.remember_slot(block);
                    continue;
                }
            };
            let current = self.blocks[block].assigned;
            if preferred == current || !self.open[block] || preferred >= self.columns.len() {
                continue;
            }

            match self.columns[preferred] {
                None => {
                    if self.blocks[block].start == self.top {
                        self.move_to(block, preferred);
                    }
                }
                Some(other) if self.blocks[other].start == self.blocks[block].start => {
                    self.move_to(other, current);
                    self.move_to(block, preferred);
                }
                Some(_) => {}
            }
        }
    }

    fn close_group(&mut self) {
        if self.current_group.is_empty() {
            return;
        }
        let group_id = self.groups.len();
        let members = std::mem::take(&mut self.current_group);
        for idx in &members {
            self.blocks[*idx].group = group_id;
        }
        let columns = match self.mode {
            ColumnMode::Greedy { .. } => self.columns.len(),
            ColumnMode::ByRoom => {
                let roomless_single = members.len() == 1
                    && self
                        .entries
                        .get(self.blocks[members[0]].id.as_str())
                        .and_then(|e| e.room.as_deref())
                        .map_or(true, |r| r.trim().is_empty());
                if roomless_single {
                    1
                } else {
                    self.rooms.len().max(1)
                }
            }
        };
        self.groups.push(BlockGroup {
            blocks: members,
            columns,
        });
        self.columns.clear();
    }

    fn push_hour(&mut self, hour: u32) {
        if hour <= self.metrics.last_grid_hour {
            self.grid.push(HourLine {
                hour: hour % 24,
                top: self.top,
            });
        }
    }

    /// One sweep step.
    ///
    /// `minutes` is the offset inside the sweep (hour lines land on multiples
    /// of 60) and `slot_minute` the absolute minute of the step.
    fn step(&mut self, points: &[(PointKind, &str)], minutes: u32, slot_minute: u32, next_day: bool) {
        let px_step = self.metrics.px_step();
        let min_px = self.metrics.min_px_per_block;

        let mut ended = Vec::new();
        let mut small = Vec::new();
        let mut stretch: f32 = 0.0;

        for (kind, id) in points {
            if *kind != PointKind::End {
                continue;
            }
            let b = self.block_for(id);
            self.blocks[b].end = self.top;
            if !self.open[b] {
                small.push(b);
                continue;
            }
            self.release(b);

            let diff = min_px - (self.blocks[b].end - self.blocks[b].start);
            if diff > 0.0 {
                self.blocks[b].end += diff;
                stretch = stretch.max(diff);
                if !self.metrics.align_ends {
                    self.blocks[b].collapsed = true;
                }
            }
            if next_day {
                self.blocks[b].end += NEXT_DAY_OVERHANG;
                self.blocks[b].unfinished = true;
            }
            ended.push(b);
        }
        self.top += stretch;

        if self.metrics.align_ends && ended.len() > 1 {
            let max_end = ended
                .iter()
                .map(|b| self.blocks[*b].end)
                .fold(f32::MIN, f32::max);
            for b in &ended {
                self.blocks[*b].end = max_end;
            }
        }

        if minutes % 60 == 0 {
            self.push_hour(slot_minute / 60);
        }

        if self.active == 0 {
            self.close_group();
        }

        let mut started = false;
        for (kind, id) in points {
            if *kind != PointKind::Start {
                continue;
            }
            let b = self.block_for(id);
            self.blocks[b].start = self.top;
            self.open[b] = true;
            self.active += 1;
            self.assign(b);
            self.current_group.push(b);
            started = true;
        }

        if started {
            if let ColumnMode::Greedy { keep_slots: true } = self.mode {
                self.reorder_slots();
            }
        }

        let advance = match self.metrics.px_per_space {
            Some(space) if self.active == 0 => space,
            _ => px_step,
        };
        self.top += advance;

        // Blocks that started and ended within this step
        let small: Vec<usize> = small.into_iter().filter(|b| self.open[*b]).collect();
        if !small.is_empty() {
            for b in &small {
                self.release(*b);
                self.blocks[*b].end = self.blocks[*b].start + min_px;
                self.blocks[*b].collapsed = true;
            }
            let lowest = small
                .iter()
                .map(|b| self.blocks[*b].end)
                .fold(self.top, f32::max);
            self.top = lowest;
        }
    }

    fn finish(mut self, whole_day: Vec<String>) -> DayLayout {
        for b in 0..self.blocks.len() {
            if self.open[b] {
                self.blocks[b].end = self.top.max(self.blocks[b].start);
                self.open[b] = false;
            }
        }
        self.close_group();

        let header = match self.mode {
            ColumnMode::ByRoom => self.rooms.clone(),
            ColumnMode::Greedy { .. } => Vec::new(),
        };

        DayLayout {
            height: self.top,
            grid: self.grid,
            blocks: self.blocks,
            groups: self.groups,
            whole_day,
            header,
        }
    }
}

pub(crate) fn sweep_day(
    entries: &DayEntries,
    options: &LayoutOptions,
    metrics: SweepMetrics,
    mode: ColumnMode,
) -> DayLayout {
    let ordered = ordered_entries(entries);
    let table = CheckpointTable::build(&ordered);
    let (start_hour, end_hour) = table.hour_window(options.day_start_hour, options.day_end_hour);
    let mut state = SweepState::new(metrics, mode, &ordered);

    if options.management_mode && start_hour > 0 {
        let base = (start_hour - 1) * 60;
        for minute in (0..60).step_by(RESOLUTION as usize) {
            state.step(&[], minute, base + minute, false);
        }
    }

    let span = (end_hour + 1).saturating_sub(start_hour) * 60;
    let mut minutes = 0;
    while minutes < span {
        let slot_minute = start_hour * 60 + minutes;
        let points = table.between(slot_minute, slot_minute + RESOLUTION);
        state.step(&points, minutes, slot_minute, false);
        minutes += RESOLUTION;
    }

    if table.has_next_day() {
        let points = table.next_day();
        state.step(&points, minutes, start_hour * 60 + minutes, true);
    } else if options.management_mode && end_hour + 1 < 25 {
        state.push_hour(end_hour + 1);
    }

    state.finish(table.whole_day().to_vec())
}

/// Packs overlapping entries tightly; empty time collapses to a thin gap
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactLayout;

impl LayoutStrategy for CompactLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Compact
    }

    fn draw_day(&self, entries: &DayEntries, options: &LayoutOptions) -> DayLayout {
        sweep_day(entries, options, COMPACT, ColumnMode::Greedy { keep_slots: true })
    }
}

/// Pixel height proportional to duration, short entries stretched
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalLayout;

impl LayoutStrategy for ProportionalLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Proportional
    }

    fn draw_day(&self, entries: &DayEntries, options: &LayoutOptions) -> DayLayout {
        sweep_day(entries, options, PROPORTIONAL, ColumnMode::Greedy { keep_slots: false })
    }
}

/// Compact sweep with one column per room
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomLayout;

impl LayoutStrategy for RoomLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Room
    }

    fn draw_day(&self, entries: &DayEntries, options: &LayoutOptions) -> DayLayout {
        sweep_day(entries, options, COMPACT, ColumnMode::ByRoom)
    }

    fn shows_room(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::EntryType;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn entry(id: &str, h: u32, m: u32, duration: i64) -> ScheduleEntry {
        let start = NaiveDate::from_ymd_opt(2024, 5, 13)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        ScheduleEntry::new(id, EntryType::Contribution, format!("Talk {}", id), start, duration).unwrap()
    }

    fn day(entries: Vec<ScheduleEntry>) -> DayEntries {
        entries.into_iter().map(|e| (e.id.clone(), e)).collect()
    }

    fn placement<'l>(layout: &'l DayLayout, id: &str) -> &'l BlockPlacement {
        layout.block(id).unwrap()
    }

    #[test]
    fn test_overlap_example_uses_two_columns() {
        let data = day(vec![entry("1", 10, 0, 60), entry("2", 10, 30, 60), entry("3", 11, 0, 60)]);
        let layout = CompactLayout.draw_day(&data, &LayoutOptions::default());

        assert_eq!(layout.groups.len(), 1);
        assert_eq!(layout.groups[0].columns, 2);
        let a = placement(&layout, "1");
        let b = placement(&layout, "2");
        let c = placement(&layout, "3");
        assert_ne!(a.assigned, b.assigned);
        assert_eq!(a.assigned, c.assigned);
    }

    #[test]
    fn test_disjoint_entries_form_separate_groups() {
        let data = day(vec![entry("1", 9, 0, 30), entry("2", 11, 0, 30)]);
        let layout = CompactLayout.draw_day(&data, &LayoutOptions::default());

        assert_eq!(layout.groups.len(), 2);
        assert!(layout.groups.iter().all(|g| g.columns == 1));
        assert_ne!(placement(&layout, "1").group, placement(&layout, "2").group);
    }

    #[test]
    fn test_hour_scale_is_strictly_increasing() {
        let data = day(vec![entry("1", 9, 0, 45), entry("2", 12, 10, 90)]);
        for layout in [
            CompactLayout.draw_day(&data, &LayoutOptions::default()),
            ProportionalLayout.draw_day(&data, &LayoutOptions::default()),
        ] {
            assert!(!layout.grid.is_empty());
            for pair in layout.grid.windows(2) {
                assert!(pair[0].top < pair[1].top, "{:?}", layout.grid);
            }
            assert_eq!(layout.grid[0].hour, 9);
        }
    }

    #[test]
    fn test_compact_stretches_short_block() {
        let data = day(vec![entry("1", 9, 0, 5)]);
        let layout = CompactLayout.draw_day(&data, &LayoutOptions::default());
        let block = placement(&layout, "1");
        assert_eq!(block.end - block.start, COMPACT.min_px_per_block);
    }

    #[test]
    fn test_proportional_height_tracks_duration() {
        let data = day(vec![entry("1", 9, 0, 60), entry("2", 10, 0, 10)]);
        let layout = ProportionalLayout.draw_day(&data, &LayoutOptions::default());

        let long = placement(&layout, "1");
        assert_eq!(long.end - long.start, 120.0);
        assert!(!long.collapsed);

        let short = placement(&layout, "2");
        assert_eq!(short.end - short.start, PROPORTIONAL.min_px_per_block);
        assert!(short.collapsed);
    }

    #[test]
    fn test_next_day_entry_is_unfinished() {
        let data = day(vec![entry("1", 22, 0, 180)]);
        let layout = CompactLayout.draw_day(&data, &LayoutOptions::default());
        let block = placement(&layout, "1");
        assert!(block.unfinished);
        assert!(block.end > block.start);
    }

    #[test]
    fn test_management_mode_adds_hours() {
        let data = day(vec![entry("1", 9, 0, 60), entry("2", 9, 30, 30)]);
        let plain = CompactLayout.draw_day(&data, &LayoutOptions::default());
        let managed = CompactLayout.draw_day(
            &data,
            &LayoutOptions {
                management_mode: true,
                ..Default::default()
            },
        );

        assert_eq!(plain.grid.first().map(|l| l.hour), Some(9));
        assert_eq!(managed.grid.first().map(|l| l.hour), Some(8));
        assert_eq!(managed.grid.last().map(|l| l.hour), Some(11));
        assert!(managed.height > plain.height);
    }

    #[test]
    fn test_zero_length_entry_gets_row() {
        let data = day(vec![entry("1", 9, 0, 0), entry("2", 9, 0, 30)]);
        let layout = ProportionalLayout.draw_day(&data, &LayoutOptions::default());
        let instant = placement(&layout, "1");
        assert!(instant.collapsed);
        assert_eq!(instant.end - instant.start, PROPORTIONAL.min_px_per_block);
    }

    #[test]
    fn test_session_slot_keeps_column() {
        let mut a1 = entry("1", 9, 0, 60);
        let mut b1 = entry("2", 9, 0, 60);
        let mut a2 = entry("3", 11, 0, 60);
        let mut b2 = entry("4", 11, 0, 60);
        for (e, session) in [(&mut a1, "A"), (&mut a2, "A"), (&mut b1, "B"), (&mut b2, "B")] {
            e.session_id = Some(session.to_string());
            e.session_slot_id = Some("0".to_string());
        }
        // Walk order puts B first in the afternoon
        a2.session_code = Some("Z".to_string());
        b2.session_code = Some("A".to_string());

        let data = day(vec![a1, b1, a2, b2]);
        let layout = CompactLayout.draw_day(&data, &LayoutOptions::default());

        assert_eq!(placement(&layout, "1").assigned, placement(&layout, "3").assigned);
        assert_eq!(placement(&layout, "2").assigned, placement(&layout, "4").assigned);
    }

    #[test]
    fn test_room_layout_columns_follow_sorted_rooms() {
        let mut a = entry("1", 9, 0, 60);
        a.room = Some("Zeta".to_string());
        let mut b = entry("2", 9, 0, 60);
        b.room = Some("Alpha".to_string());
        let mut c = entry("3", 13, 0, 30);
        c.room = Some(String::new());

        let layout = RoomLayout.draw_day(&day(vec![a, b, c]), &LayoutOptions::default());

        assert_eq!(layout.header, vec!["Alpha".to_string(), "Zeta".to_string()]);
        assert_eq!(placement(&layout, "2").assigned, 0);
        assert_eq!(placement(&layout, "1").assigned, 1);

        let roomless = placement(&layout, "3");
        assert_eq!(roomless.assigned, 0);
        assert_eq!(layout.columns_for(roomless), 1);
        assert_eq!(layout.columns_for(placement(&layout, "1")), 2);
    }

    #[test]
    fn test_whole_day_posters_skip_sweep() {
        let mut poster = entry("p", 8, 0, 9 * 60);
        poster.is_poster = true;
        let layout = CompactLayout.draw_day(&day(vec![poster, entry("1", 9, 0, 30)]), &LayoutOptions::default());
        assert_eq!(layout.whole_day, vec!["p".to_string()]);
        assert!(layout.block("p").is_none());
        assert!(layout.block("1").is_some());
    }
}
