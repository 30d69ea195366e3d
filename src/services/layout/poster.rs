//! Poster layout: one full-width row per entry, no time axis.

use super::defaults::BLOCK_MARGIN;
use super::{BlockGroup, BlockPlacement, DayLayout, LayoutOptions, LayoutStrategy};
use crate::models::entry::{DayEntries, ScheduleEntry};
use crate::models::view::LayoutKind;

pub const POSTER_ROW_HEIGHT: f32 = 40.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct PosterLayout;

impl LayoutStrategy for PosterLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Poster
    }

    fn draw_day(&self, entries: &DayEntries, _options: &LayoutOptions) -> DayLayout {
        let mut ordered: Vec<&ScheduleEntry> = entries.values().collect();
        ordered.sort_by(|a, b| {
            (a.start_date.date, a.start_date.time, &a.title).cmp(&(
                b.start_date.date,
                b.start_date.time,
                &b.title,
            ))
        });

        let mut layout = DayLayout::default();
        let mut top = 0.0;
        for (idx, entry) in ordered.iter().enumerate() {
            let mut block = BlockPlacement::new(entry.id.clone());
            block.start = top;
            block.end = top + POSTER_ROW_HEIGHT;
            block.group = idx;
            layout.blocks.push(block);
            layout.groups.push(BlockGroup {
                blocks: vec![idx],
                columns: 1,
            });
            top += POSTER_ROW_HEIGHT + BLOCK_MARGIN;
        }
        layout.height = top;
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::EntryType;
    use chrono::NaiveDate;

    #[test]
    fn test_posters_sorted_by_start_then_title() {
        let at = |h| {
            NaiveDate::from_ymd_opt(2024, 5, 14)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        let mut day = DayEntries::new();
        for (id, title, hour) in [("1", "Beta", 10), ("2", "Alpha", 10), ("3", "Gamma", 9)] {
            let e = ScheduleEntry::new(id, EntryType::Contribution, title, at(hour), 30).unwrap();
            day.insert(id.to_string(), e);
        }

        let layout = PosterLayout.draw_day(&day, &LayoutOptions::default());
        let ids: Vec<&str> = layout.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
        assert!(layout.grid.is_empty());
        assert!(layout.blocks[1].start >= layout.blocks[0].end);
    }
}
