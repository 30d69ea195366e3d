use std::collections::BTreeSet;

use super::TimetableApp;
use crate::models::view::{DetailLevel, LayoutKind, ViewType};
use crate::services::timetable::EntryFilters;
use egui::Context;

/// Flip one member of an optional "keep only" set, where `None` keeps
/// everything. Collapses back to `None` once every choice is selected.
pub(super) fn toggle_member(
    selection: &Option<BTreeSet<String>>,
    all: &[String],
    member: &str,
) -> Option<BTreeSet<String>> {
    let mut set = selection
        .clone()
        .unwrap_or_else(|| all.iter().cloned().collect());
    if !set.remove(member) {
        set.insert(member.to_string());
    }
    if all.iter().all(|m| set.contains(m)) {
        None
    } else {
        Some(set)
    }
}

fn is_selected(selection: &Option<BTreeSet<String>>, member: &str) -> bool {
    selection.as_ref().map_or(true, |set| set.contains(member))
}

impl TimetableApp {
    pub(super) fn render_menu_bar(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                self.render_file_menu(ui, ctx);
                self.render_edit_menu(ui);
                self.render_view_menu(ui, ctx);
                self.render_help_menu(ui);
            });
        });
    }

    fn render_file_menu(&mut self, ui: &mut egui::Ui, ctx: &Context) {
        ui.menu_button("File", |ui| {
            let can_import = self.local.is_some();
            if ui
                .add_enabled(can_import, egui::Button::new("📥 Import Timetable..."))
                .on_disabled_hover_text("Imports go to the local store only")
                .clicked()
            {
                self.import_timetable_json();
                ui.close_menu();
            }

            if ui.button("📄 Print Day to PDF...").clicked() {
                self.print_day_to_pdf();
                ui.close_menu();
            }

            ui.separator();

            if ui.button("🔄 Reload    Ctrl+R").clicked() {
                self.reload();
                ui.close_menu();
            }

            ui.separator();
            if ui.button("Exit").clicked() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });
    }

    fn render_edit_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("Edit", |ui| {
            let can_undo = self.undo_manager.can_undo();
            let can_redo = self.undo_manager.can_redo();

            let undo_label = if let Some(desc) = self.undo_manager.undo_description() {
                format!("↶ Undo {}    Ctrl+Z", desc)
            } else {
                "↶ Undo    Ctrl+Z".to_string()
            };

            let redo_label = if let Some(desc) = self.undo_manager.redo_description() {
                format!("↷ Redo {}    Ctrl+Y", desc)
            } else {
                "↷ Redo    Ctrl+Y".to_string()
            };

            ui.add_enabled_ui(can_undo, |ui| {
                if ui.button(&undo_label).clicked() {
                    self.perform_undo();
                    ui.close_menu();
                }
            });

            ui.add_enabled_ui(can_redo, |ui| {
                if ui.button(&redo_label).clicked() {
                    self.perform_redo();
                    ui.close_menu();
                }
            });
        });
    }

    fn render_view_menu(&mut self, ui: &mut egui::Ui, ctx: &Context) {
        ui.menu_button("View", |ui| {
            if ui
                .selectable_label(self.state.view == ViewType::Timetable, "📅 Timetable")
                .clicked()
            {
                self.state.view = ViewType::Timetable;
                ui.close_menu();
            }
            if ui
                .selectable_label(self.state.view == ViewType::Bookings, "📞 Bookings")
                .clicked()
            {
                self.state.view = ViewType::Bookings;
                ui.close_menu();
            }

            ui.separator();

            ui.menu_button("Layout", |ui| {
                let current = self.drawer.layout_kind();
                for kind in LayoutKind::ALL {
                    if ui.radio(current == kind, kind.label()).clicked() {
                        self.drawer.set_layout(kind);
                        self.config.default_layout = kind;
                        self.save_config();
                        ui.close_menu();
                    }
                }
            });

            ui.menu_button("Detail", |ui| {
                let current = self.drawer.detail();
                for detail in [DetailLevel::Session, DetailLevel::Contribution] {
                    if ui.radio(current == detail, detail.label()).clicked() {
                        self.drawer.set_detail(detail);
                        self.config.default_detail = detail;
                        self.save_config();
                        ui.close_menu();
                    }
                }
            });

            let mut management = self.drawer.options().management_mode;
            if ui.checkbox(&mut management, "Management mode").clicked() {
                self.drawer.set_management_mode(management);
                self.config.management_mode = management;
                self.save_config();
            }

            self.render_filter_submenu(ui);

            ui.separator();

            ui.menu_button("🎨 Theme", |ui| {
                let choices = [("System", None), ("Light", Some("light")), ("Dark", Some("dark"))];
                for (label, theme) in choices {
                    let selected = match theme {
                        None => self.config.use_system_theme,
                        Some(name) => !self.config.use_system_theme && self.config.theme == name,
                    };
                    if ui.selectable_label(selected, label).clicked() {
                        match theme {
                            None => self.config.use_system_theme = true,
                            Some(name) => {
                                self.config.use_system_theme = false;
                                self.config.theme = name.to_string();
                            }
                        }
                        self.apply_theme(ctx);
                        self.save_config();
                        ui.close_menu();
                    }
                }
            });
        });
    }

    fn render_filter_submenu(&mut self, ui: &mut egui::Ui) {
        let label = if self.drawer.filters().is_active() {
            "🔍 Filter (active)"
        } else {
            "🔍 Filter"
        };
        ui.menu_button(label, |ui| {
            let sessions = self.drawer.sessions();
            let rooms = self.drawer.rooms();
            let mut filters: EntryFilters = self.drawer.filters().clone();
            let mut changed = false;

            ui.label(egui::RichText::new("Sessions").strong());
            if sessions.is_empty() {
                ui.label(egui::RichText::new("No sessions").weak().italics());
            }
            let session_ids: Vec<String> = sessions.iter().map(|(id, _)| id.clone()).collect();
            for (id, title) in &sessions {
                let mut checked = is_selected(&filters.sessions, id);
                if ui.checkbox(&mut checked, title).changed() {
                    filters.sessions = toggle_member(&filters.sessions, &session_ids, id);
                    changed = true;
                }
            }

            ui.separator();
            ui.label(egui::RichText::new("Rooms").strong());
            if rooms.is_empty() {
                ui.label(egui::RichText::new("No rooms").weak().italics());
            }
            for room in &rooms {
                let mut checked = is_selected(&filters.rooms, room);
                if ui.checkbox(&mut checked, room).changed() {
                    filters.rooms = toggle_member(&filters.rooms, &rooms, room);
                    changed = true;
                }
            }

            ui.separator();
            if ui
                .add_enabled(filters.is_active(), egui::Button::new("Show everything"))
                .clicked()
            {
                filters.clear();
                changed = true;
                ui.close_menu();
            }

            if changed {
                self.drawer.set_filters(filters);
            }
        });
    }

    fn render_help_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("Help", |ui| {
            if ui.button("ℹ About...").clicked() {
                self.state.show_about_dialog = true;
                ui.close_menu();
            }
        });
    }
}
