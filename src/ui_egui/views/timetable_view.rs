//! Day canvas of the timetable.
//!
//! Paints a [`RenderedDay`] (hour grid, room header, whole-day row and
//! blocks) and turns pointer gestures on management blocks into
//! [`TimetableAction`]s. Nothing is committed from here; the app sends the
//! requests and applies the answers.

use egui::{Align2, Color32, CursorIcon, FontId, Pos2, Rect, Rounding, Sense, Stroke, Vec2};

use crate::models::commit::{CommitRequest, MoveToSession};
use crate::services::block::fit::{TextMeasure, TextRole};
use crate::services::block::{time_label, BlockAction, Decoration, PopupRenderer, RightDecorator};
use crate::services::layout::defaults::{BLOCK_MARGIN, LEFT_MARGIN, TOP_MARGIN};
use crate::services::quantize::{DragEdge, DropOutcome, RejectReason};
use crate::services::timetable::render::{PositionedBlock, RenderedDay};
use crate::services::timetable::TimetableDrawer;
use crate::ui_egui::gesture::{GestureContext, GestureManager, HANDLE_SIZE};
use crate::ui_egui::theme::TimetableTheme;

#[derive(Debug, Clone, PartialEq)]
pub enum TimetableAction {
    Commit(CommitRequest),
    /// Drop that did not lead to a commit
    SnapBack(RejectReason),
    MoveToSession(MoveToSession),
    EditTimes(String),
}

fn font_for(role: TextRole) -> FontId {
    match role {
        TextRole::Title => FontId::proportional(12.0),
        TextRole::Time | TextRole::Location => FontId::proportional(10.0),
        TextRole::Presenters | TextRole::Convener => FontId::proportional(10.0),
    }
}

/// Measures block texts with the egui fonts
pub struct EguiMeasure<'a> {
    ctx: &'a egui::Context,
}

impl<'a> EguiMeasure<'a> {
    pub fn new(ctx: &'a egui::Context) -> Self {
        Self { ctx }
    }
}

impl TextMeasure for EguiMeasure<'_> {
    fn text_width(&self, text: &str, role: TextRole) -> f32 {
        self.ctx
            .fonts(|f| f.layout_no_wrap(text.to_string(), font_for(role), Color32::WHITE).size().x)
    }

    fn line_height(&self, role: TextRole) -> f32 {
        self.ctx.fonts(|f| f.row_height(&font_for(role)))
    }
}

/// Session slot a block can be moved into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub label: String,
    pub session_id: String,
    pub session_slot_id: String,
}

pub fn session_targets(day: &RenderedDay) -> Vec<SessionTarget> {
    day.blocks
        .iter()
        .chain(day.whole_day.iter())
        .filter_map(session_target)
        .collect()
}

fn session_target(block: &PositionedBlock) -> Option<SessionTarget> {
    let entry = block.block.entry();
    if !entry.is_session() {
        return None;
    }
    Some(SessionTarget {
        label: format!("{} ({})", entry.title, time_label(entry)),
        session_id: entry.session_id.clone()?,
        session_slot_id: entry.session_slot_id.clone()?,
    })
}

/// Block rectangle in screen coordinates
fn screen_rect(origin: Pos2, block: &PositionedBlock) -> Rect {
    Rect::from_min_size(
        origin + Vec2::new(block.rect.left, block.rect.top),
        Vec2::new(block.rect.width, block.rect.height),
    )
}

pub struct TimetableView;

impl TimetableView {
    pub fn show(ui: &mut egui::Ui, drawer: &TimetableDrawer, theme: &TimetableTheme) -> Option<TimetableAction> {
        let Some(day) = drawer.rendered() else {
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new("No timetable loaded").weak());
            });
            return None;
        };

        let mut action = None;
        egui::ScrollArea::both()
            .id_source("timetable_canvas_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                action = Self::render_day(ui, drawer, day, theme);
            });
        action
    }

    fn render_day(
        ui: &mut egui::Ui,
        drawer: &TimetableDrawer,
        day: &RenderedDay,
        theme: &TimetableTheme,
    ) -> Option<TimetableAction> {
        let (canvas, painter) = ui.allocate_painter(Vec2::new(day.width, day.height), Sense::hover());
        let origin = canvas.rect.min;
        let ctx = ui.ctx().clone();
        let measure = EguiMeasure::new(&ctx);

        painter.rect_filled(canvas.rect, Rounding::ZERO, theme.canvas_background);
        Self::paint_grid(&painter, origin, day, theme);

        let mut action = None;
        let targets = session_targets(day);
        let lines = day.grid_lines();

        if ui.input(|i| i.key_pressed(egui::Key::Escape)) && GestureManager::active(&ctx).is_some() {
            GestureManager::cancel(&ctx);
        }
        let gesture = GestureManager::active(&ctx);

        let whole_day = day.whole_day.iter().map(|b| (b, false));
        let timed = day.blocks.iter().map(|b| (b, true));
        for (block, draggable) in whole_day.chain(timed) {
            let rect = screen_rect(origin, block);
            let dragging = gesture.as_ref().is_some_and(|g| g.entry_id == block.id);
            Self::paint_block(&painter, rect, block, theme, &measure, dragging);

            let editable = block.block.is_editable() && !block.pending;
            let sense = if editable && draggable {
                Sense::click_and_drag()
            } else {
                Sense::click()
            };
            let response = ui.interact(rect, ui.id().with(("timetable_block", &block.id)), sense);

            if gesture.is_none() && response.hovered() {
                if editable && draggable {
                    let cursor = match response.hover_pos() {
                        Some(pos) if pos.y >= rect.bottom() - HANDLE_SIZE.min(rect.height() / 2.0) => {
                            CursorIcon::ResizeVertical
                        }
                        _ => CursorIcon::Grab,
                    };
                    ui.output_mut(|out| out.cursor_icon = cursor);
                }
                let mut popup = block.block.popup_lines();
                popup.extend(block.block.decorations().iter().map(Decoration::tooltip));
                response.clone().on_hover_ui_at_pointer(|ui| {
                    for line in popup {
                        ui.label(line);
                    }
                });
            }

            let actions = if editable { block.block.actions() } else { Vec::new() };
            if !actions.is_empty() {
                response.context_menu(|ui| {
                    if let Some(a) = Self::render_block_menu(ui, drawer, block, &actions, &targets) {
                        action = Some(a);
                        ui.close_menu();
                    }
                });
            }

            if response.drag_started() {
                if let Some(pos) = response.interact_pointer_pos() {
                    GestureManager::begin(
                        &ctx,
                        GestureContext::begin(&block.id, block.rect.top, block.rect.height, pos.y - origin.y),
                    );
                }
            }

            if response.dragged() && GestureManager::is_active_for(&ctx, &block.id) {
                if let Some(pos) = ctx.pointer_interact_pos() {
                    GestureManager::update(&ctx, &lines, pos.y - origin.y, pos);
                    ctx.request_repaint();
                }
            }

            if response.drag_stopped() {
                if let Some(finished) = GestureManager::finish(&ctx) {
                    let shift_later = ui.input(|i| i.modifiers.shift);
                    action = Self::drop_action(drawer, day, origin, &finished, shift_later);
                }
            }
        }

        if let Some(active) = GestureManager::active(&ctx) {
            Self::paint_preview(&painter, origin, day, &active, theme);
        }

        action
    }

    fn render_block_menu(
        ui: &mut egui::Ui,
        drawer: &TimetableDrawer,
        block: &PositionedBlock,
        actions: &[BlockAction],
        targets: &[SessionTarget],
    ) -> Option<TimetableAction> {
        let mut picked = None;
        for block_action in actions {
            match block_action {
                BlockAction::EditTimes => {
                    if ui.button(block_action.label()).clicked() {
                        picked = Some(TimetableAction::EditTimes(block.id.clone()));
                    }
                }
                BlockAction::MoveToSession => {
                    ui.add_enabled_ui(!targets.is_empty(), |ui| {
                        ui.menu_button(block_action.label(), |ui| {
                            for target in targets {
                                if ui.button(&target.label).clicked() {
                                    picked = drawer.current_day().map(|day| {
                                        TimetableAction::MoveToSession(MoveToSession {
                                            entry_id: block.id.clone(),
                                            day: day.to_string(),
                                            session_id: target.session_id.clone(),
                                            session_slot_id: target.session_slot_id.clone(),
                                        })
                                    });
                                }
                            }
                        });
                    });
                }
            }
        }
        picked
    }

    /// Dropping a loose entry on a session block moves it into that session;
    /// any other drop is judged on the grid.
    fn drop_action(
        drawer: &TimetableDrawer,
        day: &RenderedDay,
        origin: Pos2,
        gesture: &GestureContext,
        shift_later: bool,
    ) -> Option<TimetableAction> {
        let dragged = day.block(&gesture.entry_id)?;
        let loose = {
            let entry = dragged.block.entry();
            !entry.is_session() && entry.session_id.is_none()
        };

        if gesture.edge == DragEdge::Start && loose {
            if let Some(pos) = gesture.pointer_pos {
                let (x, y) = (pos.x - origin.x, pos.y - origin.y);
                let target = day
                    .blocks
                    .iter()
                    .rev()
                    .filter(|b| b.id != gesture.entry_id && b.rect.contains(x, y))
                    .find_map(session_target);
                if let Some(target) = target {
                    return Some(TimetableAction::MoveToSession(MoveToSession {
                        entry_id: gesture.entry_id.clone(),
                        day: day.day.clone(),
                        session_id: target.session_id,
                        session_slot_id: target.session_slot_id,
                    }));
                }
            }
        }

        match drawer.evaluate_drop(&gesture.entry_id, gesture.edge, gesture.live_time, shift_later)? {
            DropOutcome::Commit(request) => Some(TimetableAction::Commit(request)),
            DropOutcome::SnapBack(reason) => Some(TimetableAction::SnapBack(reason)),
        }
    }

    fn paint_grid(painter: &egui::Painter, origin: Pos2, day: &RenderedDay, theme: &TimetableTheme) {
        let right = origin.x + day.width;
        for line in &day.grid {
            let y = origin.y + line.top;
            painter.line_segment(
                [Pos2::new(origin.x + LEFT_MARGIN, y), Pos2::new(right, y)],
                Stroke::new(1.0, theme.grid_line),
            );
            painter.text(
                Pos2::new(origin.x + 6.0, y),
                Align2::LEFT_CENTER,
                format!("{:02}:00", line.hour % 24),
                FontId::proportional(11.0),
                theme.grid_text,
            );
        }

        for cell in &day.header {
            painter.text(
                Pos2::new(origin.x + cell.left + cell.width / 2.0, origin.y + TOP_MARGIN / 2.0),
                Align2::CENTER_CENTER,
                &cell.label,
                FontId::proportional(12.0),
                theme.grid_text,
            );
        }
    }

    fn paint_block(
        painter: &egui::Painter,
        rect: Rect,
        block: &PositionedBlock,
        theme: &TimetableTheme,
        measure: &dyn TextMeasure,
        dragging: bool,
    ) {
        let entry = block.block.entry();
        let mut fill = theme.entry_fill(entry.color.as_deref());
        if dragging {
            fill = fill.gamma_multiply(0.5);
        }
        let text_color = theme.entry_text(entry.text_color.as_deref());
        let border = if block.pending {
            Stroke::new(2.0, theme.pending_border)
        } else {
            Stroke::new(1.0, theme.block_border)
        };

        painter.rect_filled(rect, Rounding::same(3.0), fill);
        painter.rect_stroke(rect, Rounding::same(3.0), border);

        let fitted = block.block.fit(rect.width(), rect.height(), measure);
        let clip = painter.with_clip_rect(rect.shrink(1.0));
        let inner_width = (rect.width() - 2.0 * BLOCK_MARGIN).max(1.0);
        let mut y = rect.top() + BLOCK_MARGIN / 2.0;

        let title = clip.layout(fitted.title, font_for(TextRole::Title), text_color, inner_width);
        let title_height = title.size().y;
        clip.galley(Pos2::new(rect.left() + BLOCK_MARGIN, y), title, text_color);
        if let Some(time) = fitted.time {
            clip.text(
                Pos2::new(rect.right() - BLOCK_MARGIN, y),
                Align2::RIGHT_TOP,
                time,
                font_for(TextRole::Time),
                text_color,
            );
        }
        y += title_height;

        let trailing = [
            (fitted.location, TextRole::Location),
            (fitted.presenters, TextRole::Presenters),
            (fitted.convener, TextRole::Convener),
        ];
        for (text, role) in trailing {
            let Some(text) = text else { continue };
            let width = if role == TextRole::Location {
                fitted.location_max_width.min(inner_width)
            } else {
                inner_width
            };
            let galley = clip.layout(text, font_for(role), text_color, width);
            let height = galley.size().y;
            clip.galley(Pos2::new(rect.left() + BLOCK_MARGIN, y), galley, text_color);
            y += height;
        }

        if block.unfinished {
            clip.text(
                Pos2::new(rect.center().x, rect.bottom() - 2.0),
                Align2::CENTER_BOTTOM,
                "⋯",
                FontId::proportional(12.0),
                text_color,
            );
        }

        Self::paint_decorations(&clip, rect, &block.block.decorations(), text_color);
    }

    fn paint_decorations(painter: &egui::Painter, rect: Rect, decorations: &[Decoration], color: Color32) {
        for decoration in decorations {
            match decoration {
                Decoration::Pile { count } => {
                    // One sheet per contribution, at most three drawn
                    for i in 0..(*count).min(3) {
                        let offset = i as f32 * 3.0;
                        let sheet = Rect::from_min_size(
                            Pos2::new(rect.right() - 16.0 + offset, rect.top() + 18.0 + offset),
                            Vec2::new(9.0, 11.0),
                        );
                        painter.rect_stroke(sheet, Rounding::ZERO, Stroke::new(1.0, color));
                    }
                }
                Decoration::DragHandle => {
                    painter.text(
                        Pos2::new(rect.right() - 3.0, rect.bottom() - HANDLE_SIZE - 2.0),
                        Align2::RIGHT_BOTTOM,
                        "⠿",
                        FontId::proportional(10.0),
                        color.gamma_multiply(0.6),
                    );
                }
                Decoration::ResizeHandle => {
                    let y = rect.bottom() - 3.0;
                    painter.line_segment(
                        [Pos2::new(rect.center().x - 8.0, y), Pos2::new(rect.center().x + 8.0, y)],
                        Stroke::new(1.5, color.gamma_multiply(0.6)),
                    );
                }
            }
        }
    }

    fn paint_preview(
        painter: &egui::Painter,
        origin: Pos2,
        day: &RenderedDay,
        gesture: &GestureContext,
        theme: &TimetableTheme,
    ) {
        let (Some(block), Some(pointer)) = (day.block(&gesture.entry_id), gesture.pointer_pos) else {
            return;
        };
        let (top, height) = gesture.preview(pointer.y - origin.y);
        let preview = Rect::from_min_size(
            origin + Vec2::new(block.rect.left, top),
            Vec2::new(block.rect.width, height),
        );
        painter.rect_stroke(preview, Rounding::same(3.0), Stroke::new(2.0, theme.drop_preview));

        let label = gesture.tooltip();
        let anchor = pointer + Vec2::new(14.0, -6.0);
        let galley = painter.layout_no_wrap(label, FontId::proportional(11.0), theme.block_text);
        let bubble = Rect::from_min_size(anchor - Vec2::new(0.0, galley.size().y), galley.size()).expand(3.0);
        painter.rect_filled(bubble, Rounding::same(3.0), theme.canvas_background);
        painter.rect_stroke(bubble, Rounding::same(3.0), Stroke::new(1.0, theme.drop_preview));
        painter.galley(bubble.min + Vec2::splat(3.0), galley, theme.block_text);
    }
}
