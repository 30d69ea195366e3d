//! Applying backend results to the timetable and the booking board.

use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;

use super::state::ErrorWindow;
use super::TimetableApp;
use crate::errors::ClientError;
use crate::models::commit::CommitRequest;
use crate::services::bookings::{BatchAction, BookingEvent, BookingRequest, ErrorReport};
use crate::services::dispatch::{Job, JobResult};
use crate::ui_egui::commands::HistoryStep;

impl TimetableApp {
    pub(super) fn process_job_results(&mut self) {
        for result in self.dispatcher.poll() {
            self.apply_job_result(result);
        }
    }

    fn apply_job_result(&mut self, result: JobResult) {
        match result {
            JobResult::Timetable(Ok(data)) => {
                log::info!("Timetable loaded: {} day(s)", data.len());
                self.drawer.replace_data(data);
                self.undo_manager.clear();
                self.state.history_steps.clear();
            }
            JobResult::Timetable(Err(e)) => self.show_error("Could not load the timetable", &e),
            JobResult::Day { day, result: Ok(entries) } => self.drawer.replace_day(&day, entries),
            JobResult::Day { day, result: Err(e) } => {
                log::warn!("Reloading day {} failed: {}", day, e);
                self.toast_manager.error(format!("Could not reload the day: {}", e));
            }
            JobResult::Commit { request, result } => {
                let step = self
                    .state
                    .history_steps
                    .remove(&request.entry_id)
                    .unwrap_or(HistoryStep::Record);
                match result {
                    Ok(response) => {
                        self.drawer.apply_commit(&request, response);
                        self.undo_manager.confirm(step, &request);
                        let message = match step {
                            HistoryStep::Record => format!("Moved to {}", request.start.format("%H:%M")),
                            HistoryStep::Undo => "Move undone".to_string(),
                            HistoryStep::Redo => "Move redone".to_string(),
                        };
                        self.toast_manager.success(message);
                    }
                    Err(e) => {
                        self.drawer.fail_commit(&request.entry_id);
                        self.show_error("The entry could not be moved", &e);
                    }
                }
            }
            JobResult::MovedToSession { request, result } => match result {
                Ok(entries) => {
                    self.drawer.replace_day(&request.day, entries);
                    // Intervals recorded before the move no longer describe the day
                    self.undo_manager.clear();
                    self.toast_manager.success("Entry moved into the session");
                }
                Err(e) => self.show_error("The entry could not be moved into the session", &e),
            },
            JobResult::Bookings(Ok(bookings)) => {
                log::info!("Loaded {} booking(s)", bookings.len());
                self.board.load(bookings);
            }
            JobResult::Bookings(Err(e)) => {
                log::error!("Listing bookings failed: {}", e);
                self.toast_manager.error(format!("Could not load bookings: {}", e));
            }
            JobResult::Booking { request, result } => match result {
                Ok(reply) => {
                    let outcome = request.apply(reply, &mut self.board, &self.launcher);
                    match &request {
                        BookingRequest::Create { .. } | BookingRequest::Edit { .. } | BookingRequest::Attach { .. } => {
                            self.panel.form.close();
                        }
                        BookingRequest::Search { .. } => self.panel.search.set_hits(outcome.hits),
                        BookingRequest::SendAgreement(_) => self.panel.agreement = Default::default(),
                        BookingRequest::AcceptAgreement { .. } | BookingRequest::RejectAgreement { .. } => {
                            self.panel.auth_key.clear();
                        }
                        _ => {}
                    }
                    if let Some(notice) = outcome.notice {
                        self.toast_manager.info(notice);
                    }
                }
                Err(e) => self.report_booking_error(&request, &e),
            },
        }
    }

    /// Show a failed booking request where it belongs
    pub(super) fn report_booking_error(&mut self, request: &BookingRequest, error: &ClientError) {
        match self.board.error_report(request.booking_type(), request.event(), error) {
            ErrorReport::Inline(fields) => match request {
                BookingRequest::SendAgreement(_) => self.panel.agreement.errors = fields,
                BookingRequest::Search { .. } => {
                    self.panel.search.error = fields.first().map(|f| f.message.clone());
                }
                _ if self.panel.form.open => self.panel.form.errors = fields,
                _ => {
                    let lines = fields.iter().map(|f| format!("{}: {}", f.field, f.message)).collect();
                    self.state.error_window = Some(ErrorWindow {
                        title: "Invalid input".to_string(),
                        lines,
                    });
                }
            },
            ErrorReport::Popup(popup) => {
                if self.panel.form.open && !popup.invalid_fields.is_empty() {
                    self.panel.form.errors = popup.invalid_fields.clone();
                }
                self.state.error_window = Some(popup.into());
            }
            ErrorReport::Unexpected(message) => {
                self.state.error_window = Some(ErrorWindow::new("Unexpected error", message));
            }
        }
    }

    pub(super) fn show_error(&mut self, title: &str, error: &ClientError) {
        log::error!("{}: {}", title, error);
        self.state.error_window = Some(ErrorWindow::new(title, error.to_string()));
    }

    /// Show the move right away and send it
    pub(super) fn submit_commit(&mut self, request: CommitRequest, step: HistoryStep) {
        if self.drawer.is_pending(&request.entry_id) {
            self.toast_manager
                .warning("That entry is still being saved; try again in a moment");
            return;
        }
        self.state.history_steps.insert(request.entry_id.clone(), step);
        self.drawer.begin_commit(request.clone());
        self.dispatcher.submit(Job::Commit(request));
    }

    pub(super) fn perform_undo(&mut self) {
        if let Some(request) = self.undo_manager.undo_request() {
            self.submit_commit(request, HistoryStep::Undo);
        }
    }

    pub(super) fn perform_redo(&mut self) {
        if let Some(request) = self.undo_manager.redo_request() {
            self.submit_commit(request, HistoryStep::Redo);
        }
    }

    pub(super) fn process_batch_results(&mut self, ctx: &egui::Context) {
        let Some(batch) = self.state.batch.as_mut() else {
            return;
        };

        let mut items = Vec::new();
        loop {
            match batch.results.try_recv() {
                Ok(item) => items.push(item),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Runner gone; whatever did not report counts as failed
                    let missing = batch.total.saturating_sub(batch.done + items.len());
                    batch.failed += missing;
                    batch.done += missing;
                    break;
                }
            }
        }
        let action = batch.action;

        for item in items {
            let booking_type = self
                .board
                .booking(&item.id)
                .map(|b| b.booking_type.clone())
                .unwrap_or_default();
            match item.result {
                Ok(booking) => {
                    let client = match action {
                        BatchAction::Start => self.board.complete_start(booking, &self.launcher),
                        BatchAction::Stop => self.board.complete_stop(booking, &self.launcher),
                    };
                    if let Err(e) = client {
                        log::warn!("Client-side {} of {} failed: {}", action.label(), item.id, e);
                    }
                }
                Err(e) => {
                    if let Some(batch) = self.state.batch.as_mut() {
                        batch.failed += 1;
                    }
                    let event = match action {
                        BatchAction::Start => BookingEvent::Start,
                        BatchAction::Stop => BookingEvent::Stop,
                    };
                    if let ErrorReport::Popup(popup) = self.board.error_report(&booking_type, event, &e) {
                        self.toast_manager.error(format!("{}: {}", popup.title, popup.lines.join(" ")));
                    } else {
                        self.toast_manager.error(format!("Booking {}: {}", item.id, e));
                    }
                }
            }
            if let Some(batch) = self.state.batch.as_mut() {
                batch.done += 1;
            }
        }

        let finished = self
            .state
            .batch
            .as_ref()
            .map(|b| (b.done >= b.total, b.total, b.failed, b.action));
        match finished {
            Some((true, total, failed, action)) => {
                self.state.batch = None;
                let verb = match action {
                    BatchAction::Start => "Started",
                    BatchAction::Stop => "Stopped",
                };
                if failed == 0 {
                    self.toast_manager.success(format!("{} {} booking(s)", verb, total));
                } else {
                    self.toast_manager
                        .warning(format!("{} {} of {} booking(s)", verb, total - failed, total));
                }
            }
            Some((false, ..)) => ctx.request_repaint_after(Duration::from_millis(200)),
            None => {}
        }
    }
}
