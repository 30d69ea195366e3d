use super::TimetableApp;
use egui::Context;

impl TimetableApp {
    /// Start/end editor opened from a block's context menu
    pub(super) fn render_retime_dialog(&mut self, ctx: &Context) {
        let Some(mut dialog) = self.state.retime.take() else {
            return;
        };

        let mut open = true;
        let mut save = false;
        let mut cancel = false;
        egui::Window::new("Edit times")
            .id(egui::Id::new("retime_dialog"))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(egui::RichText::new(&dialog.title).strong());
                ui.add_space(6.0);

                egui::Grid::new("retime_grid")
                    .num_columns(2)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Start (HH:MM):");
                        ui.add(egui::TextEdit::singleline(&mut dialog.start).desired_width(60.0));
                        ui.end_row();

                        ui.label("End (HH:MM):");
                        ui.add(egui::TextEdit::singleline(&mut dialog.end).desired_width(60.0));
                        ui.end_row();
                    });

                ui.checkbox(&mut dialog.shift_later, "Shift later entries by the same amount");

                if let Some(error) = &dialog.error {
                    ui.add_space(4.0);
                    ui.colored_label(ui.visuals().error_fg_color, error);
                }

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        save = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if !open || cancel {
            return;
        }
        if save && self.apply_retime(&mut dialog) {
            return;
        }
        self.state.retime = Some(dialog);
    }

    pub(super) fn render_error_window(&mut self, ctx: &Context) {
        let Some(window) = &self.state.error_window else {
            return;
        };

        let mut open = true;
        let mut dismissed = false;
        egui::Window::new(&window.title)
            .id(egui::Id::new("error_window"))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(280.0);
                for line in &window.lines {
                    ui.label(line);
                }
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });

        if !open || dismissed {
            self.state.error_window = None;
        }
    }

    pub(super) fn render_about_dialog(&mut self, ctx: &Context) {
        if !self.state.show_about_dialog {
            return;
        }

        let mut dialog_open = true;
        egui::Window::new("About Conference Timetable")
            .open(&mut dialog_open)
            .collapsible(false)
            .resizable(false)
            .auto_sized()
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(300.0);
                ui.set_max_width(400.0);

                ui.vertical_centered(|ui| {
                    ui.heading("Conference Timetable");
                    ui.add_space(5.0);
                    ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                    ui.add_space(10.0);
                    ui.separator();
                    ui.label(env!("CARGO_PKG_DESCRIPTION"));
                    ui.label(format!("License: {}", env!("CARGO_PKG_LICENSE")));
                    ui.add_space(10.0);
                });

                egui::Grid::new("about_session_info")
                    .num_columns(2)
                    .spacing([20.0, 4.0])
                    .show(ui, |ui| {
                        ui.label("Conference:");
                        ui.label(&self.config.conference_id);
                        ui.end_row();

                        ui.label("Backend:");
                        ui.label(self.config.server_url.as_deref().unwrap_or("Local store"));
                        ui.end_row();

                        ui.label("Timezone:");
                        ui.label(&self.config.timezone);
                        ui.end_row();

                        ui.label("OS:");
                        ui.label(std::env::consts::OS);
                        ui.end_row();
                    });
            });

        if !dialog_open {
            self.state.show_about_dialog = false;
        }
    }
}
