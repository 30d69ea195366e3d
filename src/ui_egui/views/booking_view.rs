//! Collaboration bookings panel.
//!
//! Renders the booking table of the event with its per-row actions, the
//! start-all/stop-all buttons, the create form and the room search. The
//! panel never talks to the backend itself; every click comes back as a
//! [`BookingAction`] for the app to route.

use egui::{Color32, RichText};
use serde_json::{json, Value};

use crate::models::booking::{AcceptRejectStatus, AgreementRequest, Booking, BookingId, SearchHit};
use crate::services::bookings::BookingBoard;
use crate::ui_egui::theme::TimetableTheme;

use super::booking_form::{AgreementFormState, BookingFormState, SearchState};

#[derive(Debug, Clone, PartialEq)]
pub enum BookingAction {
    OpenCreate(String),
    OpenEdit(BookingId),
    Create { booking_type: String, params: Value },
    Edit { id: BookingId, booking_type: String, params: Value },
    Remove(BookingId),
    Start(BookingId),
    Stop(BookingId),
    CheckStatus(BookingId),
    Accept(BookingId),
    Reject(BookingId),
    Connect(BookingId),
    Disconnect(BookingId),
    ToggleInfo(BookingId),
    StartAll,
    StopAll,
    Search { booking_type: String, query: String },
    Attach { booking_type: String, hit: SearchHit },
    OpenAgreement,
    SendAgreement(AgreementRequest),
    AcceptAgreement(String),
    RejectAgreement(String),
}

/// Parameters sent when attaching an existing room from a search
pub fn attach_params(hit: &SearchHit) -> Value {
    json!({
        "roomId": hit.id,
        "roomName": hit.name,
        "roomDescription": hit.description.clone().unwrap_or_default(),
    })
}

/// Form state owned by the panel between frames
#[derive(Debug, Default)]
pub struct BookingPanelState {
    pub form: BookingFormState,
    pub search: SearchState,
    pub agreement: AgreementFormState,
    pub create_type: String,
    pub auth_key: String,
}

fn status_color(status_class: &str, theme: &TimetableTheme) -> Color32 {
    let lower = status_class.to_lowercase();
    if lower.contains("error") || lower.contains("fail") {
        Color32::from_rgb(200, 60, 60)
    } else if lower.contains("ok") || lower.contains("success") {
        Color32::from_rgb(60, 150, 60)
    } else {
        theme.block_text
    }
}

pub struct BookingView;

impl BookingView {
    /// Render the panel. `types` are the booking types the user may create.
    pub fn show(
        ui: &mut egui::Ui,
        board: &BookingBoard,
        panel: &mut BookingPanelState,
        types: &[String],
        busy: bool,
        theme: &TimetableTheme,
    ) -> Option<BookingAction> {
        let mut action = None;

        ui.add_enabled_ui(!busy, |ui| {
            Self::render_toolbar(ui, board, panel, types, &mut action);
            ui.separator();

            egui::ScrollArea::vertical()
                .id_source("booking_table_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let head = board.table_head();
                    if let Some(message) = head.message() {
                        ui.add_space(12.0);
                        ui.label(RichText::new(message).italics().weak());
                    } else {
                        Self::render_table(ui, board, head.columns(), theme, &mut action);
                    }

                    ui.add_space(16.0);
                    ui.collapsing("Search existing rooms", |ui| {
                        if let Some(a) = panel.search.render(ui, types) {
                            action = Some(a);
                        }
                    });
                    ui.collapsing("Electronic agreement", |ui| {
                        Self::render_agreement_keys(ui, panel, &mut action);
                    });
                });
        });

        // Windows stay usable while a request runs; submitting is disabled
        // by the dispatcher being busy at the app level
        if let Some(a) = panel.form.render(ui.ctx()) {
            action = Some(a);
        }
        if let Some(a) = panel.agreement.render(ui.ctx()) {
            action = Some(a);
        }

        action
    }

    fn render_toolbar(
        ui: &mut egui::Ui,
        board: &BookingBoard,
        panel: &mut BookingPanelState,
        types: &[String],
        action: &mut Option<BookingAction>,
    ) {
        ui.horizontal(|ui| {
            if panel.create_type.is_empty() || !types.contains(&panel.create_type) {
                panel.create_type = types.first().cloned().unwrap_or_default();
            }

            ui.label("New booking:");
            egui::ComboBox::from_id_source("create_booking_type")
                .selected_text(panel.create_type.as_str())
                .show_ui(ui, |ui| {
                    for t in types {
                        ui.selectable_value(&mut panel.create_type, t.clone(), t.as_str());
                    }
                });
            if ui
                .add_enabled(!panel.create_type.is_empty(), egui::Button::new("➕ Create"))
                .clicked()
            {
                *action = Some(BookingAction::OpenCreate(panel.create_type.clone()));
            }

            let buttons = board.buttons();
            if buttons.visible {
                ui.separator();
                if ui
                    .add_enabled(buttons.start_enabled, egui::Button::new("▶ Start all"))
                    .clicked()
                {
                    *action = Some(BookingAction::StartAll);
                }
                if ui
                    .add_enabled(buttons.stop_enabled, egui::Button::new("■ Stop all"))
                    .clicked()
                {
                    *action = Some(BookingAction::StopAll);
                }
            }
        });
    }

    fn render_table(
        ui: &mut egui::Ui,
        board: &BookingBoard,
        columns: &[&str],
        theme: &TimetableTheme,
        action: &mut Option<BookingAction>,
    ) {
        egui::Grid::new("booking_table")
            .num_columns(columns.len())
            .striped(true)
            .spacing([16.0, 6.0])
            .show(ui, |ui| {
                for column in columns {
                    ui.label(RichText::new(*column).strong());
                }
                ui.end_row();

                for booking in board.bookings() {
                    ui.label(&booking.booking_type);
                    ui.vertical(|ui| {
                        ui.label(
                            RichText::new(board.status_text(booking))
                                .color(status_color(&booking.status_class, theme)),
                        );
                        if let Some(warning) = &booking.warning {
                            ui.label(RichText::new(warning).small().color(theme.pending_border));
                        }
                    });

                    let expanded = board.is_info_visible(&booking.id);
                    let label = if expanded { "▼ Info" } else { "▶ Info" };
                    if ui.small_button(label).clicked() {
                        *action = Some(BookingAction::ToggleInfo(booking.id.clone()));
                    }

                    ui.horizontal(|ui| Self::render_row_actions(ui, booking, action));
                    ui.end_row();

                    if expanded {
                        Self::render_info(ui, board, booking, theme, columns.len());
                    }
                }
            });
    }

    fn render_row_actions(ui: &mut egui::Ui, booking: &Booking, action: &mut Option<BookingAction>) {
        let id = || booking.id.clone();

        if ui.small_button("Edit").clicked() {
            *action = Some(BookingAction::OpenEdit(id()));
        }
        if ui.small_button("Remove").clicked() {
            *action = Some(BookingAction::Remove(id()));
        }
        if booking.has_start
            && ui
                .add_enabled(booking.can_be_started, egui::Button::new("Start").small())
                .clicked()
        {
            *action = Some(BookingAction::Start(id()));
        }
        if booking.has_stop
            && ui
                .add_enabled(booking.can_be_stopped, egui::Button::new("Stop").small())
                .clicked()
        {
            *action = Some(BookingAction::Stop(id()));
        }
        if booking.has_connect && ui.small_button("Connect").clicked() {
            *action = Some(BookingAction::Connect(id()));
        }
        if booking.has_disconnect && ui.small_button("Disconnect").clicked() {
            *action = Some(BookingAction::Disconnect(id()));
        }
        if booking.has_check_status && ui.small_button("Check status").clicked() {
            *action = Some(BookingAction::CheckStatus(id()));
        }
        if booking.has_accept_reject && booking.accept_reject_status == AcceptRejectStatus::Pending {
            if ui.small_button("Accept").clicked() {
                *action = Some(BookingAction::Accept(id()));
            }
            if ui.small_button("Reject").clicked() {
                *action = Some(BookingAction::Reject(id()));
            }
        }
    }

    fn render_info(
        ui: &mut egui::Ui,
        board: &BookingBoard,
        booking: &Booking,
        theme: &TimetableTheme,
        columns: usize,
    ) {
        let rows = board.info_rows(&booking.id);
        ui.label("");
        egui::Frame::none()
            .fill(theme.info_background)
            .inner_margin(egui::Margin::same(6.0))
            .show(ui, |ui| {
                if rows.is_empty() {
                    ui.label(RichText::new("No additional information").small().weak());
                }
                for row in rows {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(format!("{}:", row.label)).small().strong());
                        ui.label(RichText::new(row.value).small());
                    });
                }
            });
        for _ in 2..columns {
            ui.label("");
        }
        ui.end_row();
    }

    fn render_agreement_keys(ui: &mut egui::Ui, panel: &mut BookingPanelState, action: &mut Option<BookingAction>) {
        if ui.button("✉ Send agreement to speakers...").clicked() {
            *action = Some(BookingAction::OpenAgreement);
        }
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut panel.auth_key).hint_text("Agreement key"));
            let has_key = !panel.auth_key.trim().is_empty();
            if ui.add_enabled(has_key, egui::Button::new("Accept")).clicked() {
                *action = Some(BookingAction::AcceptAgreement(panel.auth_key.trim().to_string()));
            }
            if ui.add_enabled(has_key, egui::Button::new("Reject")).clicked() {
                *action = Some(BookingAction::RejectAgreement(panel.auth_key.trim().to_string()));
            }
        });
    }
}
