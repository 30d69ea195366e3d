use std::path::Path;

use anyhow::Context as _;

use super::confirm::ConfirmAction;
use super::state::RetimeDialog;
use super::TimetableApp;
use crate::models::entry::TimetableData;
use crate::services::block::time_label;
use crate::services::dispatch::Job;
use crate::services::pdf::{PdfExportOptions, PdfExportService};
use crate::services::quantize::{DropOutcome, RejectReason};
use crate::ui_egui::commands::HistoryStep;
use crate::ui_egui::views::TimetableAction;
use crate::utils::date::day_caption;

/// Toast text for a refused drop; `None` when the drop changed nothing
pub(super) fn snap_back_message(reason: RejectReason) -> Option<&'static str> {
    match reason {
        RejectReason::Unchanged => None,
        RejectReason::NoTime => Some("Drop the entry on the timetable grid"),
        RejectReason::Midnight => Some("Entries cannot be moved to midnight"),
        RejectReason::BeforeDayStart => Some("That is before the start of the day"),
        RejectReason::CrossesMidnight => Some("The entry would run past midnight"),
        RejectReason::EndBeforeStart => Some("The end must be after the start"),
    }
}

impl TimetableApp {
    pub(super) fn handle_timetable_action(&mut self, action: TimetableAction) {
        match action {
            TimetableAction::Commit(request) => self.submit_commit(request, HistoryStep::Record),
            TimetableAction::SnapBack(reason) => {
                log::debug!("Drop refused: {:?}", reason);
                if let Some(message) = snap_back_message(reason) {
                    self.toast_manager.warning(message);
                }
            }
            TimetableAction::MoveToSession(request) => {
                log::info!("Moving entry {} into session {}", request.entry_id, request.session_id);
                self.dispatcher.submit(Job::MoveToSession(request));
            }
            TimetableAction::EditTimes(id) => self.open_retime_dialog(&id),
        }
    }

    fn open_retime_dialog(&mut self, id: &str) {
        let Some(entry) = self.drawer.displayed_entry(id) else {
            return;
        };
        self.state.retime = Some(RetimeDialog {
            entry_id: entry.id.clone(),
            title: format!("{} ({})", entry.title, time_label(&entry)),
            start: entry.start().format("%H:%M").to_string(),
            end: entry.end().format("%H:%M").to_string(),
            shift_later: false,
            error: None,
        });
    }

    /// Judge typed-in times; a commit closes the dialog
    pub(super) fn apply_retime(&mut self, dialog: &mut RetimeDialog) -> bool {
        let (start, end) = match dialog.times() {
            Ok(times) => times,
            Err(message) => {
                dialog.error = Some(message);
                return false;
            }
        };
        match self
            .drawer
            .evaluate_retime(&dialog.entry_id, start, end, dialog.shift_later)
        {
            Some(DropOutcome::Commit(request)) => {
                self.submit_commit(request, HistoryStep::Record);
                true
            }
            Some(DropOutcome::SnapBack(RejectReason::Unchanged)) => true,
            Some(DropOutcome::SnapBack(reason)) => {
                dialog.error = snap_back_message(reason).map(str::to_string);
                false
            }
            None => {
                dialog.error = Some("The entry is no longer on this day".to_string());
                false
            }
        }
    }

    pub(super) fn render_day_navigation(&mut self, ui: &mut egui::Ui) {
        let days = self.drawer.days();
        let current = self.drawer.current_day().map(str::to_string);
        let index = current
            .as_ref()
            .and_then(|day| days.iter().position(|d| d == day));

        ui.horizontal(|ui| {
            let has_prev = index.is_some_and(|i| i > 0);
            if ui.add_enabled(has_prev, egui::Button::new("◀")).clicked() {
                if let Some(day) = index.and_then(|i| days.get(i - 1)) {
                    self.drawer.set_day(day);
                }
            }

            if let Some(mut date) = self.drawer.current_date() {
                let before = date;
                ui.add(egui_extras::DatePickerButton::new(&mut date).id_source("timetable_day_picker"));
                if date != before && !self.drawer.set_date(date) {
                    self.toast_manager.info(format!("Nothing scheduled on {}", day_caption(date)));
                }
            }

            let has_next = index.is_some_and(|i| i + 1 < days.len());
            if ui.add_enabled(has_next, egui::Button::new("▶")).clicked() {
                if let Some(day) = index.and_then(|i| days.get(i + 1)) {
                    self.drawer.set_day(day);
                }
            }

            if let Some(date) = self.drawer.current_date() {
                ui.label(egui::RichText::new(day_caption(date)).strong());
            }

            if self.drawer.filters().is_active() {
                ui.label(egui::RichText::new("(filtered)").small().weak());
            }
        });
    }

    pub(super) fn step_day(&mut self, forward: bool) {
        let days = self.drawer.days();
        let Some(index) = self
            .drawer
            .current_day()
            .and_then(|day| days.iter().position(|d| d == day))
        else {
            return;
        };
        let target = if forward { index.checked_add(1) } else { index.checked_sub(1) };
        if let Some(day) = target.and_then(|i| days.get(i)) {
            self.drawer.set_day(day);
        }
    }

    pub(super) fn reload(&mut self) {
        if self.drawer.has_pending() {
            self.confirm_dialog.request(ConfirmAction::ReloadWithPending);
            return;
        }
        self.dispatcher.submit(Job::FetchTimetable);
        self.dispatcher.submit(Job::ListBookings);
    }

    pub(super) fn import_timetable_json(&mut self) {
        let Some(local) = self.local.clone() else {
            self.toast_manager.warning("Imports need the local store");
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Timetable JSON", &["json"])
            .pick_file()
        else {
            return;
        };

        let imported = read_timetable(&path).and_then(|data| local.import_timetable(&data));
        match imported {
            Ok(count) => {
                log::info!("Imported {} entries from {}", count, path.display());
                self.toast_manager.success(format!("Imported {} entries", count));
                self.dispatcher.submit(Job::FetchTimetable);
            }
            Err(e) => {
                log::error!("Import failed: {:#}", e);
                self.toast_manager.error(format!("Import failed: {}", e));
            }
        }
    }

    pub(super) fn print_day_to_pdf(&mut self) {
        let Some(rendered) = self.drawer.rendered() else {
            self.toast_manager.info("Nothing to print");
            return;
        };
        let file_name = format!("timetable_{}.pdf", rendered.day);
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PDF", &["pdf"])
            .set_file_name(&file_name)
            .save_file()
        else {
            return;
        };

        let options = PdfExportOptions {
            title: self
                .drawer
                .current_date()
                .map(day_caption)
                .unwrap_or_else(|| "Timetable".to_string()),
            ..PdfExportOptions::default()
        };
        match PdfExportService::export_day(rendered, &path, &options) {
            Ok(()) => self.toast_manager.success(format!("Saved {}", path.display())),
            Err(e) => {
                log::error!("PDF export failed: {:#}", e);
                self.toast_manager.error(format!("PDF export failed: {}", e));
            }
        }
    }
}

fn read_timetable(path: &Path) -> anyhow::Result<TimetableData> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a timetable export", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unchanged_drop_is_silent() {
        assert_eq!(snap_back_message(RejectReason::Unchanged), None);
        assert!(snap_back_message(RejectReason::Midnight).is_some());
    }

    #[test]
    fn test_read_timetable_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"20240513\": []}}").unwrap();
        assert!(read_timetable(file.path()).is_err());

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, "{{}}").unwrap();
        assert!(read_timetable(empty.path()).unwrap().is_empty());
    }
}
