// Drag and resize gestures on the timetable canvas
//
// A gesture starts when a management block is grabbed. Grabbing the bottom
// strip resizes (end edge), anywhere else moves (start edge). Only one gesture
// exists at a time; beginning one replaces whatever was stored before.

use egui::{Context, Id, Pos2};

use crate::services::quantize::{time_at, DragEdge, GridLine, GridTime};

/// Height of the resize strip at the bottom of a block
pub const HANDLE_SIZE: f32 = 8.0;

#[derive(Clone, Debug, PartialEq)]
pub struct GestureContext {
    pub entry_id: String,
    pub edge: DragEdge,
    /// Block top and height in canvas coordinates when grabbed
    pub original_top: f32,
    pub original_height: f32,
    /// Pointer y minus block top at grab time
    pub grab_offset: f32,
    /// Quantized time of the significant edge under the pointer
    pub live_time: Option<GridTime>,
    pub pointer_pos: Option<Pos2>,
}

impl GestureContext {
    /// Start a gesture on a block grabbed at canvas y `pointer_y`
    pub fn begin(entry_id: &str, block_top: f32, block_height: f32, pointer_y: f32) -> Self {
        Self {
            entry_id: entry_id.to_string(),
            edge: edge_for_grab(block_top, block_height, pointer_y),
            original_top: block_top,
            original_height: block_height,
            grab_offset: pointer_y - block_top,
            live_time: None,
            pointer_pos: None,
        }
    }

    /// Canvas y of the significant edge for a pointer at `pointer_y`
    pub fn edge_y(&self, pointer_y: f32) -> f32 {
        match self.edge {
            DragEdge::Start => pointer_y - self.grab_offset,
            DragEdge::End => pointer_y,
        }
    }

    /// Preview rectangle (top, height) while the pointer is at `pointer_y`
    pub fn preview(&self, pointer_y: f32) -> (f32, f32) {
        match self.edge {
            DragEdge::Start => (self.edge_y(pointer_y), self.original_height),
            DragEdge::End => (
                self.original_top,
                (pointer_y - self.original_top).max(HANDLE_SIZE),
            ),
        }
    }

    /// Re-quantize for a pointer at canvas y
    pub fn track(&mut self, lines: &[GridLine], pointer_y: f32) {
        self.live_time = time_at(lines, self.edge_y(pointer_y));
    }

    pub fn tooltip(&self) -> String {
        let verb = match self.edge {
            DragEdge::Start => "Start",
            DragEdge::End => "End",
        };
        match self.live_time {
            Some(time) => format!("{} {}", verb, time.label()),
            None => format!("{} --:--", verb),
        }
    }
}

/// Move or resize, decided by where the block was grabbed
pub fn edge_for_grab(block_top: f32, block_height: f32, pointer_y: f32) -> DragEdge {
    let bottom = block_top + block_height;
    // Tiny blocks would be all handle; keep at least half of them for moving
    let strip = HANDLE_SIZE.min(block_height / 2.0);
    if pointer_y >= bottom - strip {
        DragEdge::End
    } else {
        DragEdge::Start
    }
}

pub struct GestureManager;

impl GestureManager {
    fn storage_id() -> Id {
        Id::new("timetable_gesture_state")
    }

    pub fn begin(ctx: &Context, context: GestureContext) {
        log::debug!("Begin {:?} gesture on entry {}", context.edge, context.entry_id);
        ctx.memory_mut(|mem| {
            mem.data.insert_temp(Self::storage_id(), context);
        });
    }

    pub fn active(ctx: &Context) -> Option<GestureContext> {
        ctx.memory_mut(|mem| mem.data.get_temp::<GestureContext>(Self::storage_id()))
    }

    pub fn is_active_for(ctx: &Context, entry_id: &str) -> bool {
        Self::active(ctx).is_some_and(|g| g.entry_id == entry_id)
    }

    /// Track the pointer for the active gesture
    pub fn update(ctx: &Context, lines: &[GridLine], pointer_y: f32, pointer_pos: Pos2) -> Option<GestureContext> {
        let id = Self::storage_id();
        ctx.memory_mut(|mem| {
            let mut state = mem.data.get_temp::<GestureContext>(id)?;
            state.track(lines, pointer_y);
            state.pointer_pos = Some(pointer_pos);
            mem.data.insert_temp(id, state.clone());
            Some(state)
        })
    }

    pub fn finish(ctx: &Context) -> Option<GestureContext> {
        let id = Self::storage_id();
        ctx.memory_mut(|mem| {
            let current = mem.data.get_temp::<GestureContext>(id);
            mem.data.remove::<GestureContext>(id);
            current
        })
    }

    pub fn cancel(ctx: &Context) {
        ctx.memory_mut(|mem| {
            mem.data.remove::<GestureContext>(Self::storage_id());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::layout::HourLine;
    use crate::services::quantize::grid_lines;

    fn lines() -> Vec<GridLine> {
        grid_lines(&[
            HourLine { hour: 9, top: 0.0 },
            HourLine { hour: 10, top: 60.0 },
            HourLine { hour: 11, top: 120.0 },
            HourLine { hour: 12, top: 180.0 },
        ])
    }

    #[test]
    fn test_grab_position_picks_edge() {
        assert_eq!(edge_for_grab(100.0, 60.0, 110.0), DragEdge::Start);
        assert_eq!(edge_for_grab(100.0, 60.0, 155.0), DragEdge::End);
        // 10 px block: only the lower half resizes
        assert_eq!(edge_for_grab(100.0, 10.0, 103.0), DragEdge::Start);
        assert_eq!(edge_for_grab(100.0, 10.0, 106.0), DragEdge::End);
    }

    #[test]
    fn test_move_tracks_block_top() {
        // Grabbed 20 px below the top of a 9:00 block
        let mut gesture = GestureContext::begin("c1", 0.0, 60.0, 20.0);
        assert_eq!(gesture.edge, DragEdge::Start);
        gesture.track(&lines(), 110.0);
        // Top edge at 90 px: half past ten
        assert_eq!(gesture.live_time, Some(GridTime::new(10, 30)));
        assert_eq!(gesture.preview(110.0), (90.0, 60.0));
        assert_eq!(gesture.tooltip(), "Start 10:30");
    }

    #[test]
    fn test_resize_tracks_pointer() {
        let mut gesture = GestureContext::begin("c1", 0.0, 60.0, 58.0);
        assert_eq!(gesture.edge, DragEdge::End);
        gesture.track(&lines(), 150.0);
        assert_eq!(gesture.live_time, Some(GridTime::new(11, 30)));
        assert_eq!(gesture.preview(150.0), (0.0, 150.0));
    }

    #[test]
    fn test_above_grid_has_no_time() {
        let mut gesture = GestureContext::begin("c1", 0.0, 60.0, 30.0);
        gesture.track(&lines(), 10.0);
        assert_eq!(gesture.live_time, None);
        assert_eq!(gesture.tooltip(), "Start --:--");
    }

    #[test]
    fn test_begin_replaces_previous_gesture() {
        let ctx = Context::default();
        GestureManager::begin(&ctx, GestureContext::begin("a", 0.0, 60.0, 10.0));
        GestureManager::update(&ctx, &lines(), 100.0, Pos2::new(5.0, 100.0));
        GestureManager::begin(&ctx, GestureContext::begin("b", 60.0, 60.0, 70.0));

        let active = GestureManager::active(&ctx).unwrap();
        assert_eq!(active.entry_id, "b");
        assert_eq!(active.live_time, None);
        assert!(GestureManager::is_active_for(&ctx, "b"));

        assert!(GestureManager::finish(&ctx).is_some());
        assert!(GestureManager::active(&ctx).is_none());
    }
}
