use super::TimetableApp;
use crate::models::view::ViewType;

impl TimetableApp {
    fn any_dialog_open(&self) -> bool {
        self.state.retime.is_some()
            || self.state.error_window.is_some()
            || self.state.show_about_dialog
            || self.confirm_dialog.is_open()
            || self.panel.form.open
            || self.panel.agreement.open
    }

    pub(super) fn handle_keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        // Text fields keep their own arrow keys and Ctrl+Z
        if ctx.wants_keyboard_input() {
            return;
        }

        let (undo, redo, reload, prev, next, escape) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(egui::Key::Z),
                i.modifiers.command && i.key_pressed(egui::Key::Y),
                i.modifiers.command && i.key_pressed(egui::Key::R),
                i.key_pressed(egui::Key::ArrowLeft),
                i.key_pressed(egui::Key::ArrowRight),
                i.key_pressed(egui::Key::Escape),
            )
        });

        if escape {
            if self.state.retime.is_some() {
                self.state.retime = None;
            } else if self.state.error_window.is_some() {
                self.state.error_window = None;
            } else if self.state.show_about_dialog {
                self.state.show_about_dialog = false;
            }
        }

        if self.any_dialog_open() {
            return;
        }

        if undo {
            self.perform_undo();
        }
        if redo {
            self.perform_redo();
        }
        if reload {
            self.reload();
        }

        if self.state.view == ViewType::Timetable {
            if prev {
                self.step_day(false);
            }
            if next {
                self.step_day(true);
            }
        }
    }
}
