//! Status bar: backend activity, batch progress, unsaved moves and the
//! current day.

use super::TimetableApp;
use crate::models::view::ViewType;
use crate::services::bookings::BatchAction;
use crate::utils::date::day_caption;
use egui::{Color32, RichText};

const SEPARATOR_WIDTH: f32 = 8.0;

fn secondary_text_color(is_dark: bool) -> Color32 {
    if is_dark {
        Color32::from_gray(160)
    } else {
        Color32::from_gray(100)
    }
}

fn pending_color(is_dark: bool) -> Color32 {
    if is_dark {
        Color32::from_rgb(255, 180, 80)
    } else {
        Color32::from_rgb(200, 120, 0)
    }
}

/// "Starting 3/5 (1 failed)"
pub(super) fn batch_label(action: BatchAction, done: usize, total: usize, failed: usize) -> String {
    let verb = match action {
        BatchAction::Start => "Starting",
        BatchAction::Stop => "Stopping",
    };
    if failed > 0 {
        format!("{} {}/{} ({} failed)", verb, done, total, failed)
    } else {
        format!("{} {}/{}", verb, done, total)
    }
}

impl TimetableApp {
    pub(super) fn render_status_bar(&mut self, ctx: &egui::Context) {
        let is_dark = self.active_theme.is_dark;

        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    self.render_status_left(ui, is_dark);

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        self.render_status_right(ui, is_dark);
                    });
                });
            });
    }

    fn render_status_left(&self, ui: &mut egui::Ui, is_dark: bool) {
        let view_name = match self.state.view {
            ViewType::Timetable => "📅 Timetable",
            ViewType::Bookings => "📞 Bookings",
        };
        ui.label(RichText::new(view_name).small());

        ui.add_space(SEPARATOR_WIDTH);
        ui.separator();
        ui.add_space(SEPARATOR_WIDTH);

        let day = self
            .drawer
            .current_date()
            .map(day_caption)
            .unwrap_or_else(|| "No timetable".to_string());
        ui.label(RichText::new(day).small());

        ui.add_space(SEPARATOR_WIDTH);
        ui.separator();
        ui.add_space(SEPARATOR_WIDTH);

        ui.label(
            RichText::new(self.drawer.layout_kind().label())
                .small()
                .color(secondary_text_color(is_dark)),
        );
    }

    fn render_status_right(&self, ui: &mut egui::Ui, is_dark: bool) {
        if self.drawer.has_pending() {
            ui.label(RichText::new("● Saving moves").small().color(pending_color(is_dark)))
                .on_hover_text("Some moves are waiting for the server");
        } else {
            ui.label(RichText::new("✓ Saved").small().color(secondary_text_color(is_dark)));
        }

        if let Some(batch) = &self.state.batch {
            ui.add_space(SEPARATOR_WIDTH);
            ui.separator();
            ui.add_space(SEPARATOR_WIDTH);
            ui.label(RichText::new(batch_label(batch.action, batch.done, batch.total, batch.failed)).small());
        }

        if self.dispatcher.is_busy() {
            ui.add_space(SEPARATOR_WIDTH);
            ui.separator();
            ui.add_space(SEPARATOR_WIDTH);
            ui.label(
                RichText::new(format!("{} request(s)", self.dispatcher.in_flight()))
                    .small()
                    .color(secondary_text_color(is_dark)),
            );
            ui.spinner();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_label() {
        assert_eq!(batch_label(BatchAction::Start, 2, 5, 0), "Starting 2/5");
        assert_eq!(batch_label(BatchAction::Stop, 3, 3, 1), "Stopping 3/3 (1 failed)");
    }
}
