use super::confirm::ConfirmAction;
use super::state::BatchProgress;
use super::TimetableApp;
use crate::models::entry::TimetableData;
use crate::services::bookings::{ActionRoute, BatchAction, BatchRunner, BookingRequest, ParamContext};
use crate::services::dispatch::Job;
use crate::ui_egui::views::booking_view::attach_params;
use crate::ui_egui::views::BookingAction;
use crate::utils::date::now_in;
use chrono::NaiveDateTime;

/// First start and last end over the whole event
pub(super) fn event_bounds(data: &TimetableData) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    let entries = data.values().flat_map(|day| day.values());
    let start = entries.clone().map(|e| e.start()).min();
    let end = entries.map(|e| e.end()).max();
    (start, end)
}

impl TimetableApp {
    fn param_context(&self) -> ParamContext {
        let (min_start, max_end) = event_bounds(self.drawer.data());
        ParamContext {
            conference_id: self.config.conference_id.clone(),
            now: now_in(self.config.tz()),
            min_start,
            max_end,
        }
    }

    /// Validate and send a booking request
    pub(super) fn send_booking_request(&mut self, request: BookingRequest) {
        let ctx = self.param_context();
        if let Err(e) = request.validate(self.board.registry(), &ctx) {
            log::debug!("{} rejected before sending: {}", request.event(), e);
            self.report_booking_error(&request, &e);
            return;
        }
        self.dispatcher.submit(Job::Booking(request));
    }

    fn booking_type_of(&self, id: &str) -> Option<String> {
        self.board.booking(id).map(|b| b.booking_type.clone())
    }

    pub(super) fn handle_booking_action(&mut self, action: BookingAction) {
        match action {
            BookingAction::OpenCreate(booking_type) => match self.board.check_permission(&booking_type, "create") {
                Ok(()) => self.panel.form.open_create(&booking_type),
                Err(message) => self.toast_manager.warning(message),
            },
            BookingAction::OpenEdit(id) => {
                if let Some(booking) = self.board.booking(&id) {
                    self.panel.form.open_edit(booking);
                }
            }
            BookingAction::Create { booking_type, params } => {
                self.send_booking_request(BookingRequest::Create { booking_type, params });
            }
            BookingAction::Edit { id, booking_type, params } => {
                self.send_booking_request(BookingRequest::Edit { id, booking_type, params });
            }
            BookingAction::Remove(id) => {
                if let Some(booking_type) = self.booking_type_of(&id) {
                    self.confirm_dialog
                        .request(ConfirmAction::RemoveBooking { id, booking_type });
                }
            }
            BookingAction::Start(id) => self.start_booking(&id),
            BookingAction::Stop(id) => self.stop_booking(&id),
            BookingAction::CheckStatus(id) => {
                if let Some(booking_type) = self.booking_type_of(&id) {
                    self.send_booking_request(BookingRequest::CheckStatus { id, booking_type });
                }
            }
            BookingAction::Accept(id) => {
                if let Some(booking_type) = self.booking_type_of(&id) {
                    self.send_booking_request(BookingRequest::Accept { id, booking_type });
                }
            }
            BookingAction::Reject(id) => {
                if let Some(booking_type) = self.booking_type_of(&id) {
                    self.confirm_dialog.request(ConfirmAction::RejectBooking {
                        id,
                        booking_type,
                        reason: String::new(),
                    });
                }
            }
            BookingAction::Connect(id) => {
                let result = self.board.connect(&id, &self.launcher);
                self.report_client_action("connect", &id, result);
            }
            BookingAction::Disconnect(id) => {
                let result = self.board.disconnect(&id, &self.launcher);
                self.report_client_action("disconnect", &id, result);
            }
            BookingAction::ToggleInfo(id) => {
                self.board.toggle_info(&id);
            }
            BookingAction::StartAll => self.start_batch(BatchAction::Start),
            BookingAction::StopAll => self.start_batch(BatchAction::Stop),
            BookingAction::Search { booking_type, query } => {
                self.send_booking_request(BookingRequest::Search { booking_type, query });
            }
            BookingAction::Attach { booking_type, hit } => {
                let params = attach_params(&hit);
                self.send_booking_request(BookingRequest::Attach { booking_type, params });
            }
            BookingAction::OpenAgreement => {
                self.panel.agreement.open = true;
                self.panel.agreement.errors.clear();
            }
            BookingAction::SendAgreement(request) => {
                self.send_booking_request(BookingRequest::SendAgreement(request));
            }
            BookingAction::AcceptAgreement(auth_key) => {
                self.send_booking_request(BookingRequest::AcceptAgreement { auth_key });
            }
            BookingAction::RejectAgreement(auth_key) => {
                self.confirm_dialog.request(ConfirmAction::RejectAgreement {
                    auth_key,
                    reason: String::new(),
                });
            }
        }
    }

    fn start_booking(&mut self, id: &str) {
        let Some(booking_type) = self.booking_type_of(id) else {
            return;
        };
        match self.board.route_start(id) {
            Some(ActionRoute::Server) => self.send_booking_request(BookingRequest::Start {
                id: id.to_string(),
                booking_type,
            }),
            Some(ActionRoute::Local) => {
                let result = self.board.start_local(id, &self.launcher);
                self.report_client_action("start", id, result);
            }
            Some(ActionRoute::Denied) => {
                let reason = self
                    .board
                    .booking(id)
                    .and_then(|b| b.warning.clone())
                    .unwrap_or_else(|| "This booking cannot be started yet".to_string());
                self.toast_manager.warning(reason);
            }
            None => {}
        }
    }

    fn stop_booking(&mut self, id: &str) {
        let Some(booking_type) = self.booking_type_of(id) else {
            return;
        };
        match self.board.route_stop(id) {
            Some(ActionRoute::Server) => self.send_booking_request(BookingRequest::Stop {
                id: id.to_string(),
                booking_type,
            }),
            Some(ActionRoute::Local) => {
                let result = self.board.stop_local(id, &self.launcher);
                self.report_client_action("stop", id, result);
            }
            Some(ActionRoute::Denied) => self.toast_manager.warning("This booking cannot be stopped"),
            None => {}
        }
    }

    fn report_client_action(&mut self, verb: &str, id: &str, result: anyhow::Result<bool>) {
        match result {
            Ok(true) => log::info!("Client {} of booking {}", verb, id),
            Ok(false) => self
                .toast_manager
                .info(format!("Nothing to {} for this booking", verb)),
            Err(e) => {
                log::warn!("Client {} of booking {} failed: {:#}", verb, id, e);
                self.toast_manager.error(format!("Could not {}: {}", verb, e));
            }
        }
    }

    fn start_batch(&mut self, action: BatchAction) {
        if self.state.batch.is_some() {
            self.toast_manager.warning("A batch is already running");
            return;
        }

        let plan = match action {
            BatchAction::Start => self.board.plan_start_all(),
            BatchAction::Stop => self.board.plan_stop_all(),
        };
        for warning in &plan.warnings {
            self.toast_manager.warning(warning.clone());
        }
        if plan.ids.is_empty() {
            self.toast_manager.info(format!("Nothing to {}", action.label()));
            return;
        }

        let Some(runtime) = self.runtime.as_ref() else {
            self.toast_manager.error("Batch runner is not available");
            return;
        };

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let runner = BatchRunner::from_millis(self.config.batch_delay_ms);
        let backend = self.dispatcher.booking_backend();
        let total = plan.ids.len();
        let ids = plan.ids;
        runtime.spawn(async move {
            runner.run_backend(backend, action, ids, tx).await;
        });

        self.state.batch = Some(BatchProgress {
            action,
            total,
            done: 0,
            failed: 0,
            results: rx,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{DayEntries, EntryType, ScheduleEntry};
    use chrono::NaiveDate;

    #[test]
    fn test_event_bounds_span_all_days() {
        let at = |d, h| {
            NaiveDate::from_ymd_opt(2024, 5, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        let mut data = TimetableData::new();
        for (day, hour) in [(13, 9), (14, 15)] {
            let entry = ScheduleEntry::new(format!("e{}", day), EntryType::Break, "Coffee", at(day, hour), 30).unwrap();
            let entries: DayEntries = [(entry.id.clone(), entry.clone())].into_iter().collect();
            data.insert(entry.day_key(), entries);
        }

        let (start, end) = event_bounds(&data);
        assert_eq!(start, Some(at(13, 9)));
        assert_eq!(end, Some(at(14, 15) + chrono::Duration::minutes(30)));
        assert_eq!(event_bounds(&TimetableData::new()), (None, None));
    }
}
