// Booking requests
// Every panel action is one request against the booking backend

use serde_json::Value;

use super::board::BookingBoard;
use super::registry::{BookingEvent, Launcher, ParamContext, PluginRegistry};
use crate::errors::{ClientError, ClientResult};
use crate::models::booking::{reject_reason, AgreementRequest, Booking, BookingId, FieldError, SearchHit};
use crate::services::backend::BookingBackend;

#[derive(Debug, Clone, PartialEq)]
pub enum BookingRequest {
    Create { booking_type: String, params: Value },
    Edit { id: BookingId, booking_type: String, params: Value },
    Remove { id: BookingId, booking_type: String },
    Start { id: BookingId, booking_type: String },
    Stop { id: BookingId, booking_type: String },
    CheckStatus { id: BookingId, booking_type: String },
    Accept { id: BookingId, booking_type: String },
    Reject { id: BookingId, booking_type: String, reason: String },
    Attach { booking_type: String, params: Value },
    Search { booking_type: String, query: String },
    SendAgreement(AgreementRequest),
    AcceptAgreement { auth_key: String },
    RejectAgreement { auth_key: String, reason: String },
}

/// Successful reply of a [`BookingRequest`]
#[derive(Debug, Clone, PartialEq)]
pub enum BookingReply {
    Booking(Booking),
    Removed(BookingId),
    Hits(Vec<SearchHit>),
    Done,
}

/// Effect of a reply on the panel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplyOutcome {
    /// Message for a toast
    pub notice: Option<String>,
    pub hits: Vec<SearchHit>,
}

impl BookingRequest {
    pub fn event(&self) -> BookingEvent {
        match self {
            BookingRequest::Create { .. } => BookingEvent::Create,
            BookingRequest::Edit { .. } => BookingEvent::Edit,
            BookingRequest::Remove { .. } => BookingEvent::Remove,
            BookingRequest::Start { .. } => BookingEvent::Start,
            BookingRequest::Stop { .. } => BookingEvent::Stop,
            BookingRequest::CheckStatus { .. } => BookingEvent::CheckStatus,
            BookingRequest::Accept { .. } | BookingRequest::AcceptAgreement { .. } => BookingEvent::Accept,
            BookingRequest::Reject { .. } | BookingRequest::RejectAgreement { .. } => BookingEvent::Reject,
            BookingRequest::Attach { .. } => BookingEvent::Attach,
            BookingRequest::Search { .. } => BookingEvent::Search,
            BookingRequest::SendAgreement(_) => BookingEvent::Create,
        }
    }

    /// Type tag used to pick the plugin error handler
    pub fn booking_type(&self) -> &str {
        match self {
            BookingRequest::Create { booking_type, .. }
            | BookingRequest::Edit { booking_type, .. }
            | BookingRequest::Remove { booking_type, .. }
            | BookingRequest::Start { booking_type, .. }
            | BookingRequest::Stop { booking_type, .. }
            | BookingRequest::CheckStatus { booking_type, .. }
            | BookingRequest::Accept { booking_type, .. }
            | BookingRequest::Reject { booking_type, .. }
            | BookingRequest::Attach { booking_type, .. }
            | BookingRequest::Search { booking_type, .. } => booking_type,
            BookingRequest::SendAgreement(_)
            | BookingRequest::AcceptAgreement { .. }
            | BookingRequest::RejectAgreement { .. } => "",
        }
    }

    /// Progress caption while the request runs
    pub fn progress_text(&self) -> &'static str {
        match self {
            BookingRequest::Create { .. } => "Creating booking...",
            BookingRequest::Edit { .. } => "Modifying booking...",
            BookingRequest::Remove { .. } => "Removing your booking...",
            BookingRequest::Start { .. } => "Starting...",
            BookingRequest::Stop { .. } => "Stopping...",
            BookingRequest::CheckStatus { .. } => "Checking status...",
            BookingRequest::Accept { .. } => "Accepting request...",
            BookingRequest::Reject { .. } => "Rejecting request...",
            BookingRequest::Attach { .. } => "Attaching room...",
            BookingRequest::Search { .. } => "Searching...",
            BookingRequest::SendAgreement(_) => "Sending agreement e-mails...",
            BookingRequest::AcceptAgreement { .. } => "Accepting agreement...",
            BookingRequest::RejectAgreement { .. } => "Rejecting agreement...",
        }
    }

    /// Checks run before anything is sent
    pub fn validate(&self, registry: &PluginRegistry, ctx: &ParamContext) -> ClientResult<()> {
        let errors = match self {
            BookingRequest::Create { booking_type, params }
            | BookingRequest::Edit { booking_type, params, .. }
            | BookingRequest::Attach { booking_type, params } => registry.validate(booking_type, params, ctx),
            BookingRequest::Search { query, .. } if query.trim().is_empty() => {
                vec![FieldError::new("query", "Please enter a search text")]
            }
            BookingRequest::SendAgreement(request) => validate_agreement(request),
            _ => Vec::new(),
        };

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation(errors))
        }
    }

    pub fn execute(&self, backend: &dyn BookingBackend) -> ClientResult<BookingReply> {
        log::debug!("Booking request: {}", self.event());
        let reply = match self {
            BookingRequest::Create { booking_type, params } => {
                BookingReply::Booking(backend.create_booking(booking_type, params)?)
            }
            BookingRequest::Edit { id, params, .. } => BookingReply::Booking(backend.edit_booking(id, params)?),
            BookingRequest::Remove { id, .. } => {
                backend.remove_booking(id)?;
                BookingReply::Removed(id.clone())
            }
            BookingRequest::Start { id, .. } => BookingReply::Booking(backend.start_booking(id)?),
            BookingRequest::Stop { id, .. } => BookingReply::Booking(backend.stop_booking(id)?),
            BookingRequest::CheckStatus { id, .. } => BookingReply::Booking(backend.check_status(id)?),
            BookingRequest::Accept { id, .. } => BookingReply::Booking(backend.accept_booking(id)?),
            BookingRequest::Reject { id, reason, .. } => {
                BookingReply::Booking(backend.reject_booking(id, &reject_reason(reason))?)
            }
            BookingRequest::Attach { booking_type, params } => {
                BookingReply::Booking(backend.attach_booking(booking_type, params)?)
            }
            BookingRequest::Search { booking_type, query } => {
                BookingReply::Hits(backend.search(booking_type, query.trim())?)
            }
            BookingRequest::SendAgreement(request) => {
                backend.send_agreement(request)?;
                BookingReply::Done
            }
            BookingRequest::AcceptAgreement { auth_key } => {
                backend.accept_agreement(auth_key)?;
                BookingReply::Done
            }
            BookingRequest::RejectAgreement { auth_key, reason } => {
                backend.reject_agreement(auth_key, &reject_reason(reason))?;
                BookingReply::Done
            }
        };
        Ok(reply)
    }

    /// Apply a successful reply to the board
    pub fn apply(&self, reply: BookingReply, board: &mut BookingBoard, launcher: &dyn Launcher) -> ReplyOutcome {
        let mut outcome = ReplyOutcome::default();
        match (self, reply) {
            (BookingRequest::Create { .. } | BookingRequest::Attach { .. }, BookingReply::Booking(booking)) => {
                outcome.notice = board.create_success(booking);
            }
            (BookingRequest::Edit { .. }, BookingReply::Booking(booking)) => {
                outcome.notice = board.edit_success(booking);
            }
            (BookingRequest::Remove { .. }, BookingReply::Removed(id)) => {
                outcome.notice = board.remove_success(&id);
            }
            (BookingRequest::Start { .. }, BookingReply::Booking(booking)) => {
                if let Err(err) = board.complete_start(booking, launcher) {
                    log::warn!("Client-side start failed: {}", err);
                    outcome.notice = Some(format!("Could not open the booking: {}", err));
                }
            }
            (BookingRequest::Stop { .. }, BookingReply::Booking(booking)) => {
                if let Err(err) = board.complete_stop(booking, launcher) {
                    log::warn!("Client-side stop failed: {}", err);
                    outcome.notice = Some(format!("Could not stop the booking: {}", err));
                }
            }
            (_, BookingReply::Booking(booking)) => board.refresh_booking(booking),
            (_, BookingReply::Hits(hits)) => outcome.hits = hits,
            (BookingRequest::SendAgreement(request), BookingReply::Done) => {
                outcome.notice = Some(format!(
                    "Agreement e-mail sent to {} speaker(s)",
                    request.unique_id_list.len()
                ));
            }
            (BookingRequest::AcceptAgreement { .. }, BookingReply::Done) => {
                outcome.notice = Some("Agreement accepted".to_string());
            }
            (BookingRequest::RejectAgreement { .. }, BookingReply::Done) => {
                outcome.notice = Some("Agreement rejected".to_string());
            }
            (request, reply) => log::warn!("Unexpected reply {:?} to {}", reply, request.event()),
        }
        outcome
    }
}

fn validate_agreement(request: &AgreementRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if request.unique_id_list.is_empty() {
        errors.push(FieldError::new("uniqueIdList", "Please select at least one speaker"));
    }
    if request.from_name.trim().is_empty() {
        errors.push(FieldError::new("fromName", "This field is mandatory"));
    }
    if !request.from_email.contains('@') {
        errors.push(FieldError::new("fromEmail", "Please enter a valid e-mail address"));
    }
    if let Some(bad) = request.cc.iter().find(|cc| !cc.contains('@')) {
        errors.push(FieldError::new("cc", format!("Invalid e-mail address: {}", bad)));
    }
    if request.content.trim().is_empty() {
        errors.push(FieldError::new("content", "The e-mail text cannot be empty"));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backend::MockBookingBackend;
    use crate::services::bookings::registry::MockLauncher;
    use chrono::NaiveDate;
    use mockall::predicate::eq;
    use serde_json::json;

    fn ctx() -> ParamContext {
        ParamContext {
            conference_id: "42".to_string(),
            now: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            min_start: None,
            max_end: None,
        }
    }

    #[test]
    fn test_validate_uses_plugin_checks() {
        let registry = PluginRegistry::with_builtins();
        let request = BookingRequest::Create {
            booking_type: "Vidyo".to_string(),
            params: json!({"roomName": "", "roomDescription": "Hall"}),
        };
        match request.validate(&registry, &ctx()) {
            Err(ClientError::Validation(fields)) => assert_eq!(fields[0].field, "roomName"),
            other => panic!("unexpected {:?}", other),
        }

        let remove = BookingRequest::Remove {
            id: "1".to_string(),
            booking_type: "Vidyo".to_string(),
        };
        assert!(remove.validate(&registry, &ctx()).is_ok());
    }

    #[test]
    fn test_reject_without_reason_uses_default() {
        let mut backend = MockBookingBackend::new();
        backend
            .expect_reject_booking()
            .with(eq("9"), eq("No reason specified"))
            .times(1)
            .returning(|id, _| Ok(Booking::new(id, "WebcastRequest")));

        let request = BookingRequest::Reject {
            id: "9".to_string(),
            booking_type: "WebcastRequest".to_string(),
            reason: "   ".to_string(),
        };
        assert!(matches!(request.execute(&backend).unwrap(), BookingReply::Booking(_)));
    }

    #[test]
    fn test_remove_flow_updates_board() {
        let mut backend = MockBookingBackend::new();
        backend.expect_remove_booking().with(eq("7")).times(1).returning(|_| Ok(()));

        let mut board = BookingBoard::default();
        board.load(vec![Booking::new("7", "Vidyo")]);
        let request = BookingRequest::Remove {
            id: "7".to_string(),
            booking_type: "Vidyo".to_string(),
        };
        let reply = request.execute(&backend).unwrap();
        let launcher = MockLauncher::new();
        request.apply(reply, &mut board, &launcher);

        assert!(board.is_empty());
        assert!(!board.has_launch_target("iframeTarget7"));
    }

    #[test]
    fn test_business_error_passes_through() {
        let mut backend = MockBookingBackend::new();
        backend.expect_start_booking().returning(|_| {
            Err(ClientError::Business(crate::errors::BusinessError::rejected(
                "start",
                "Room is busy",
            )))
        });
        let request = BookingRequest::Start {
            id: "3".to_string(),
            booking_type: "CERNMCU".to_string(),
        };
        let err = request.execute(&backend).unwrap_err();
        assert_eq!(err.category(), crate::errors::ErrorCategory::Business);
    }

    #[test]
    fn test_agreement_validation() {
        let request = AgreementRequest {
            unique_id_list: vec!["s1".to_string()],
            from_name: "Organiser".to_string(),
            from_email: "organiser.example.org".to_string(),
            cc: vec!["ok@example.org".to_string()],
            content: "Please sign".to_string(),
        };
        let errors = validate_agreement(&request);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "fromEmail");
    }

    #[test]
    fn test_search_hits_are_returned() {
        let mut backend = MockBookingBackend::new();
        backend
            .expect_search()
            .with(eq("Vidyo"), eq("plenary"))
            .returning(|_, _| {
                Ok(vec![SearchHit {
                    id: "r1".to_string(),
                    name: "Plenary".to_string(),
                    description: None,
                    owner: None,
                }])
            });
        let request = BookingRequest::Search {
            booking_type: "Vidyo".to_string(),
            query: " plenary ".to_string(),
        };
        let mut board = BookingBoard::default();
        let reply = request.execute(&backend).unwrap();
        let outcome = request.apply(reply, &mut board, &MockLauncher::new());
        assert_eq!(outcome.hits.len(), 1);
        assert!(board.is_empty());
    }
}
