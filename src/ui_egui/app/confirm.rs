//! Confirmation dialogs for destructive booking actions.
//!
//! Rejections carry a free-text reason that is edited inside the dialog; an
//! empty reason is replaced by the default one when the request is sent.

use egui::{Context, RichText};

use super::TimetableApp;
use crate::models::booking::BookingId;
use crate::services::bookings::BookingRequest;
use crate::services::dispatch::Job;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmAction {
    RemoveBooking { id: BookingId, booking_type: String },
    RejectBooking { id: BookingId, booking_type: String, reason: String },
    RejectAgreement { auth_key: String, reason: String },
    /// Reload while moves are still waiting for the server
    ReloadWithPending,
}

impl ConfirmAction {
    pub fn title(&self) -> &'static str {
        match self {
            ConfirmAction::RemoveBooking { .. } => "Remove Booking",
            ConfirmAction::RejectBooking { .. } => "Reject Request",
            ConfirmAction::RejectAgreement { .. } => "Reject Agreement",
            ConfirmAction::ReloadWithPending => "Reload Timetable",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ConfirmAction::RemoveBooking { id, booking_type } => format!(
                "Are you sure you want to remove the {} booking {}?\n\nThis action cannot be undone.",
                booking_type, id
            ),
            ConfirmAction::RejectBooking { booking_type, .. } => {
                format!("Reject this {} request? You may give a reason.", booking_type)
            }
            ConfirmAction::RejectAgreement { .. } => "Reject the agreement? You may give a reason.".to_string(),
            ConfirmAction::ReloadWithPending => {
                "Some moves have not been confirmed by the server yet.\n\nReload anyway?".to_string()
            }
        }
    }

    pub fn confirm_text(&self) -> &'static str {
        match self {
            ConfirmAction::RemoveBooking { .. } => "Remove",
            ConfirmAction::RejectBooking { .. } | ConfirmAction::RejectAgreement { .. } => "Reject",
            ConfirmAction::ReloadWithPending => "Reload",
        }
    }

    pub fn is_destructive(&self) -> bool {
        !matches!(self, ConfirmAction::ReloadWithPending)
    }

    fn reason_mut(&mut self) -> Option<&mut String> {
        match self {
            ConfirmAction::RejectBooking { reason, .. } | ConfirmAction::RejectAgreement { reason, .. } => {
                Some(reason)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResult {
    Confirmed,
    Cancelled,
    Pending,
}

#[derive(Debug, Default)]
pub struct ConfirmDialogState {
    pending_action: Option<ConfirmAction>,
    confirmed: bool,
}

impl ConfirmDialogState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, action: ConfirmAction) {
        self.pending_action = Some(action);
        self.confirmed = false;
    }

    pub fn is_open(&self) -> bool {
        self.pending_action.is_some() && !self.confirmed
    }

    pub fn cancel(&mut self) {
        self.pending_action = None;
        self.confirmed = false;
    }

    /// Render the dialog. A confirmed action stays stored until taken with
    /// [`ConfirmDialogState::take_action`].
    pub fn render(&mut self, ctx: &Context) -> ConfirmResult {
        if self.confirmed {
            return ConfirmResult::Confirmed;
        }
        let Some(action) = self.pending_action.as_mut() else {
            return ConfirmResult::Pending;
        };

        let mut result = ConfirmResult::Pending;
        let title = action.title();
        let message = action.message();
        let destructive = action.is_destructive();
        let confirm_text = action.confirm_text();

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(300.0);
                ui.set_max_width(420.0);
                ui.add_space(10.0);

                if destructive {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("⚠").size(24.0).color(egui::Color32::from_rgb(220, 150, 50)));
                        ui.label(&message);
                    });
                } else {
                    ui.label(&message);
                }

                if let Some(reason) = action.reason_mut() {
                    ui.add_space(8.0);
                    ui.add(
                        egui::TextEdit::multiline(reason)
                            .hint_text("Reason (optional)")
                            .desired_rows(3),
                    );
                }

                ui.add_space(15.0);
                ui.separator();
                ui.add_space(10.0);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let confirm_button = if destructive {
                        egui::Button::new(RichText::new(confirm_text).color(egui::Color32::WHITE))
                            .fill(egui::Color32::from_rgb(180, 60, 60))
                    } else {
                        egui::Button::new(confirm_text)
                    };

                    if ui.add(confirm_button).clicked() {
                        result = ConfirmResult::Confirmed;
                    }
                    ui.add_space(10.0);
                    if ui.button("Cancel").clicked() {
                        result = ConfirmResult::Cancelled;
                    }
                });
                ui.add_space(5.0);
            });

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            result = ConfirmResult::Cancelled;
        }

        match result {
            ConfirmResult::Confirmed => self.confirmed = true,
            ConfirmResult::Cancelled => self.cancel(),
            ConfirmResult::Pending => {}
        }
        result
    }

    pub fn take_action(&mut self) -> Option<ConfirmAction> {
        self.confirmed = false;
        self.pending_action.take()
    }
}

impl TimetableApp {
    pub(super) fn handle_confirm_dialog(&mut self, ctx: &Context) {
        if self.confirm_dialog.render(ctx) == ConfirmResult::Confirmed {
            if let Some(action) = self.confirm_dialog.take_action() {
                self.execute_confirmed_action(action);
            }
        }
    }

    fn execute_confirmed_action(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::RemoveBooking { id, booking_type } => {
                self.send_booking_request(BookingRequest::Remove { id, booking_type });
            }
            ConfirmAction::RejectBooking { id, booking_type, reason } => {
                self.send_booking_request(BookingRequest::Reject { id, booking_type, reason });
            }
            ConfirmAction::RejectAgreement { auth_key, reason } => {
                self.send_booking_request(BookingRequest::RejectAgreement { auth_key, reason });
            }
            ConfirmAction::ReloadWithPending => {
                log::info!("Reloading with unconfirmed moves");
                self.dispatcher.submit(Job::FetchTimetable);
                self.dispatcher.submit(Job::ListBookings);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_action_after_confirm() {
        let mut dialog = ConfirmDialogState::new();
        dialog.request(ConfirmAction::RemoveBooking {
            id: "7".to_string(),
            booking_type: "Vidyo".to_string(),
        });
        assert!(dialog.is_open());

        dialog.confirmed = true;
        assert!(!dialog.is_open());
        assert!(matches!(
            dialog.take_action(),
            Some(ConfirmAction::RemoveBooking { ref id, .. }) if id == "7"
        ));
        assert!(dialog.take_action().is_none());
    }

    #[test]
    fn test_only_rejections_take_a_reason() {
        let mut reject = ConfirmAction::RejectBooking {
            id: "9".to_string(),
            booking_type: "WebcastRequest".to_string(),
            reason: String::new(),
        };
        assert!(reject.reason_mut().is_some());
        assert!(ConfirmAction::ReloadWithPending.reason_mut().is_none());
        assert!(!ConfirmAction::ReloadWithPending.is_destructive());
    }
}
