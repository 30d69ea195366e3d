//! Layout output turned into page coordinates.
//!
//! Everything in a [`RenderedDay`] is in pixels relative to the top left of
//! the day canvas: the whole-day row sits under the top margin, the hour grid
//! and the timed blocks below it.

use std::collections::BTreeSet;

use crate::models::entry::{DayEntries, ScheduleEntry};
use crate::models::view::{DetailLevel, LayoutKind};
use crate::services::block::TimetableBlock;
use crate::services::layout::defaults::{BOTTOM_MARGIN, LEFT_MARGIN, RIGHT_MARGIN, TOP_MARGIN};
use crate::services::layout::geometry::column_geometry;
use crate::services::layout::{HourLine, LayoutOptions, LayoutStrategy};
use crate::services::quantize::{grid_lines, GridLine};

/// Height of the row holding whole-day posters
pub const WHOLE_DAY_ROW_HEIGHT: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BlockRect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.left + self.width && y >= self.top && y <= self.top + self.height
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedBlock {
    pub id: String,
    pub rect: BlockRect,
    pub unfinished: bool,
    pub collapsed: bool,
    /// Shown at a position the server has not confirmed yet
    pub pending: bool,
    pub block: TimetableBlock,
}

/// Column caption of the room layout
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub label: String,
    pub left: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDay {
    pub day: String,
    pub layout: LayoutKind,
    pub width: f32,
    /// Canvas height including margins
    pub height: f32,
    pub grid: Vec<HourLine>,
    pub blocks: Vec<PositionedBlock>,
    pub whole_day: Vec<PositionedBlock>,
    pub header: Vec<HeaderCell>,
}

impl RenderedDay {
    pub fn block(&self, id: &str) -> Option<&PositionedBlock> {
        self.blocks
            .iter()
            .chain(self.whole_day.iter())
            .find(|b| b.id == id)
    }

    /// Topmost timed block under a point; later blocks are painted on top
    pub fn block_at(&self, x: f32, y: f32) -> Option<&PositionedBlock> {
        self.blocks.iter().rev().find(|b| b.rect.contains(x, y))
    }

    pub fn grid_lines(&self) -> Vec<GridLine> {
        grid_lines(&self.grid)
    }

    /// Hour of the last gridline; 24 when the window runs to midnight.
    ///
    /// Lines are one hour apart and store the hour modulo 24, so the end is
    /// counted from the first line.
    pub fn window_end_hour(&self) -> u32 {
        match self.grid.first() {
            Some(first) => first.hour + self.grid.len() as u32 - 1,
            None => 24,
        }
    }
}

/// Everything a day render depends on besides the entries
pub struct RenderContext<'a> {
    pub strategy: &'a dyn LayoutStrategy,
    pub options: LayoutOptions,
    pub detail: DetailLevel,
    pub width: f32,
    pub pending: &'a BTreeSet<String>,
}

pub fn render_day(day: &str, entries: &DayEntries, ctx: &RenderContext<'_>) -> RenderedDay {
    let layout = ctx.strategy.draw_day(entries, &ctx.options);
    let shows_room = ctx.strategy.shows_room();

    let make_block = |entry: &ScheduleEntry, height: f32| {
        TimetableBlock::new(entry, ctx.options.management_mode, shows_room, ctx.detail, height)
    };

    let mut whole_day = Vec::new();
    if !layout.whole_day.is_empty() {
        let count = layout.whole_day.len();
        for (idx, id) in layout.whole_day.iter().enumerate() {
            let Some(entry) = entries.get(id) else {
                continue;
            };
            let geo = column_geometry(ctx.width, count, idx);
            let height = WHOLE_DAY_ROW_HEIGHT - 3.0;
            whole_day.push(PositionedBlock {
                id: id.clone(),
                rect: BlockRect {
                    left: geo.left,
                    top: TOP_MARGIN,
                    width: geo.width,
                    height,
                },
                unfinished: false,
                collapsed: false,
                pending: ctx.pending.contains(id),
                block: make_block(entry, height),
            });
        }
    }

    let offset = TOP_MARGIN
        + if whole_day.is_empty() {
            0.0
        } else {
            WHOLE_DAY_ROW_HEIGHT
        };

    let mut blocks = Vec::with_capacity(layout.blocks.len());
    for placement in &layout.blocks {
        let Some(entry) = entries.get(&placement.id) else {
            log::warn!("Layout placed unknown entry {}", placement.id);
            continue;
        };
        let geo = column_geometry(ctx.width, layout.columns_for(placement), placement.assigned);
        let height = placement.height();
        blocks.push(PositionedBlock {
            id: placement.id.clone(),
            rect: BlockRect {
                left: geo.left,
                top: offset + placement.start,
                width: geo.width,
                height,
            },
            unfinished: placement.unfinished,
            collapsed: placement.collapsed,
            pending: ctx.pending.contains(&placement.id),
            block: make_block(entry, height),
        });
    }

    let grid = layout
        .grid
        .iter()
        .map(|line| HourLine {
            hour: line.hour,
            top: offset + line.top,
        })
        .collect();

    let header = layout
        .header
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let geo = column_geometry(ctx.width, layout.header.len(), idx);
            HeaderCell {
                label: label.clone(),
                left: geo.left,
                width: geo.width,
            }
        })
        .collect();

    RenderedDay {
        day: day.to_string(),
        layout: ctx.strategy.kind(),
        width: ctx.width.max(LEFT_MARGIN + RIGHT_MARGIN),
        height: offset + layout.height + BOTTOM_MARGIN,
        grid,
        blocks,
        whole_day,
        header,
    }
}
