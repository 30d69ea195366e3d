// Booking model
// Collaboration bookings (video rooms, webcasts) attached to an event

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Booking identifier as assigned by the server
pub type BookingId = String;

/// Tri-state acceptance status of a booking that needs approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AcceptRejectStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    #[serde(rename = "type")]
    pub booking_type: String,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub status_class: String,
    #[serde(default)]
    pub has_start: bool,
    #[serde(default)]
    pub has_stop: bool,
    #[serde(default)]
    pub can_be_started: bool,
    #[serde(default)]
    pub can_be_stopped: bool,
    #[serde(default)]
    pub has_start_stop_all: bool,
    #[serde(default)]
    pub requires_server_call_for_start: bool,
    #[serde(default)]
    pub requires_client_call_for_start: bool,
    #[serde(default)]
    pub requires_server_call_for_stop: bool,
    #[serde(default)]
    pub requires_client_call_for_stop: bool,
    #[serde(default)]
    pub has_connect: bool,
    #[serde(default)]
    pub has_disconnect: bool,
    #[serde(default)]
    pub has_check_status: bool,
    #[serde(default)]
    pub has_accept_reject: bool,
    #[serde(default)]
    pub accept_reject_status: AcceptRejectStatus,
    #[serde(default)]
    pub permission_to_start: bool,
    #[serde(default)]
    pub permission_to_stop: bool,
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub url: Option<String>,
    /// Notice the server attaches to a create, edit or remove
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub booking_params: serde_json::Value,
}

impl Booking {
    pub fn new(id: impl Into<BookingId>, booking_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            booking_type: booking_type.into(),
            status_message: String::new(),
            status_class: String::new(),
            has_start: false,
            has_stop: false,
            can_be_started: false,
            can_be_stopped: false,
            has_start_stop_all: false,
            requires_server_call_for_start: false,
            requires_client_call_for_start: false,
            requires_server_call_for_stop: false,
            requires_client_call_for_stop: false,
            has_connect: false,
            has_disconnect: false,
            has_check_status: false,
            has_accept_reject: false,
            accept_reject_status: AcceptRejectStatus::Pending,
            permission_to_start: false,
            permission_to_stop: false,
            start_date: None,
            end_date: None,
            url: None,
            warning: None,
            booking_params: serde_json::Value::Null,
        }
    }

    /// A booking counts towards "start all" when it can be started right now
    pub fn is_startable(&self) -> bool {
        self.has_start && self.can_be_started
    }

    pub fn is_stoppable(&self) -> bool {
        self.has_stop && self.can_be_stopped
    }

    /// Frame name used as the target of client-side actions
    pub fn launch_target(&self) -> String {
        launch_target_name(&self.id)
    }
}

pub fn launch_target_name(id: &str) -> String {
    format!("iframeTarget{}", id)
}

/// One hit of a booking search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

/// Electronic agreement e-mail sent to speakers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementRequest {
    pub unique_id_list: Vec<String>,
    pub from_name: String,
    pub from_email: String,
    #[serde(default)]
    pub cc: Vec<String>,
    pub content: String,
}

/// Reason used when a rejection is submitted empty
pub const DEFAULT_REJECT_REASON: &str = "No reason specified";

pub fn reject_reason(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        DEFAULT_REJECT_REASON.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Field-level validation problem, shown next to the offending input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Message attached to fields the server refused because they contain markup
pub fn sanitization_message(field: &str) -> String {
    format!(
        "Tags in the {} field are not allowed. Please remove them and try again.",
        field
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_target_name() {
        let booking = Booking::new("7", "Vidyo");
        assert_eq!(booking.launch_target(), "iframeTarget7");
    }

    #[test]
    fn test_reject_reason_default() {
        assert_eq!(reject_reason("  "), "No reason specified");
        assert_eq!(reject_reason(" busy "), "busy");
    }

    #[test]
    fn test_deserialize_partial_booking() {
        let json = r#"{"id": "3", "type": "CERNMCU", "hasStart": true, "canBeStarted": true,
                       "statusMessage": "Booking created", "bookingParams": {"name": "Room A"}}"#;
        let booking: Booking = serde_json::from_str(json).unwrap();
        assert_eq!(booking.booking_type, "CERNMCU");
        assert!(booking.is_startable());
        assert!(!booking.is_stoppable());
        assert_eq!(booking.accept_reject_status, AcceptRejectStatus::Pending);
        assert_eq!(booking.booking_params["name"], "Room A");
    }
}
