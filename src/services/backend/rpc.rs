// Remote backend
// Booking calls go through the JSON-RPC service, timetable data through REST endpoints

use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::envelope::{check_business, decode, unwrap_reply, RpcRequest, RpcResponse};
use super::{BookingBackend, TimetableBackend, SEARCH_LIMIT};
use crate::errors::{ClientError, ClientResult};
use crate::models::booking::{AgreementRequest, Booking, SearchHit};
use crate::models::commit::{CommitRequest, CommitResponse, MoveToSession};
use crate::models::entry::{DayEntries, ScheduleEntry, TimetableData};

const JSON_RPC_PATH: &str = "services/json-rpc";

/// Server URL joined with URL-encoded path segments
pub fn endpoint(base_url: &str, segments: &[&str]) -> String {
    let mut url = base_url.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(&urlencoding::encode(segment));
    }
    url
}

/// Reply of a move commit: either the entry or the whole day
#[derive(Debug, Deserialize)]
struct CommitReply {
    #[serde(default)]
    entry: Option<ScheduleEntry>,
    #[serde(default)]
    day: Option<String>,
    #[serde(default)]
    entries: Option<DayEntries>,
}

impl CommitReply {
    fn into_response(self) -> ClientResult<CommitResponse> {
        match self {
            CommitReply {
                day: Some(day),
                entries: Some(entries),
                ..
            } => Ok(CommitResponse::Day { day, entries }),
            CommitReply {
                entry: Some(entry), ..
            } => Ok(CommitResponse::Entry(entry)),
            _ => Err(ClientError::Transport(
                "Commit reply carries neither an entry nor a day".to_string(),
            )),
        }
    }
}

pub struct RpcBackend {
    client: Client,
    base_url: String,
    conference_id: String,
}

impl RpcBackend {
    pub fn new(base_url: &str, conference_id: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            conference_id: conference_id.to_string(),
        })
    }

    fn call(&self, method: &str, params: Value) -> ClientResult<Value> {
        log::debug!("RPC {} for event {}", method, self.conference_id);
        let response: RpcResponse = self
            .client
            .post(endpoint(&self.base_url, &[JSON_RPC_PATH]))
            .json(&RpcRequest::new(method, &params))
            .send()?
            .error_for_status()?
            .json()?;

        unwrap_reply(response).map_err(|err| {
            log::warn!("RPC {} failed: {}", method, err);
            err
        })
    }

    fn call_booking(&self, method: &str, params: Value) -> ClientResult<Booking> {
        decode(self.call(method, params)?)
    }

    fn booking_params(&self, id: &str) -> Value {
        json!({"conference": self.conference_id, "bookingId": id})
    }

    fn timetable_url(&self, tail: &[&str]) -> String {
        let mut segments = vec!["event", self.conference_id.as_str(), "manage", "timetable"];
        segments.extend_from_slice(tail);
        endpoint(&self.base_url, &segments)
    }

    fn get_json(&self, url: &str) -> ClientResult<Value> {
        log::debug!("GET {}", url);
        let value: Value = self.client.get(url).send()?.error_for_status()?.json()?;
        check_business(&value)?;
        Ok(value)
    }

    fn post_form(&self, url: &str, form: &[(&str, String)]) -> ClientResult<Value> {
        log::debug!("POST {}", url);
        let value: Value = self
            .client
            .post(url)
            .form(form)
            .send()?
            .error_for_status()?
            .json()?;
        check_business(&value)?;
        Ok(value)
    }
}

impl TimetableBackend for RpcBackend {
    fn fetch_timetable(&self) -> ClientResult<TimetableData> {
        decode(self.get_json(&self.timetable_url(&["data"]))?)
    }

    fn fetch_day(&self, day: &str) -> ClientResult<DayEntries> {
        decode(self.get_json(&self.timetable_url(&["day", day]))?)
    }

    fn commit_move(&self, request: &CommitRequest) -> ClientResult<CommitResponse> {
        let url = self.timetable_url(&["entry", &request.entry_id, "move"]);
        let form = [
            ("day", request.day.clone()),
            ("startDate", request.start.format("%Y-%m-%dT%H:%M").to_string()),
            ("endDate", request.end.format("%Y-%m-%dT%H:%M").to_string()),
            ("shiftLater", request.shift_later.to_string()),
        ];
        let reply: CommitReply = decode(self.post_form(&url, &form)?)?;
        reply.into_response()
    }

    fn move_to_session(&self, request: &MoveToSession) -> ClientResult<DayEntries> {
        let url = self.timetable_url(&["entry", &request.entry_id, "move-to-session"]);
        let form = [
            ("day", request.day.clone()),
            ("sessionId", request.session_id.clone()),
            ("sessionSlotId", request.session_slot_id.clone()),
        ];
        let reply: CommitReply = decode(self.post_form(&url, &form)?)?;
        reply
            .entries
            .ok_or_else(|| ClientError::Transport("Move reply carries no day".to_string()))
    }
}

impl BookingBackend for RpcBackend {
    fn list_bookings(&self) -> ClientResult<Vec<Booking>> {
        let url = endpoint(
            &self.base_url,
            &["event", &self.conference_id, "manage", "collaboration", "bookings"],
        );
        decode(self.get_json(&url)?)
    }

    fn create_booking(&self, booking_type: &str, params: &Value) -> ClientResult<Booking> {
        self.call_booking(
            "collaboration.createCSBooking",
            json!({"conference": self.conference_id, "type": booking_type, "bookingParams": params}),
        )
    }

    fn edit_booking(&self, id: &str, params: &Value) -> ClientResult<Booking> {
        self.call_booking(
            "collaboration.editCSBooking",
            json!({"conference": self.conference_id, "bookingId": id, "bookingParams": params}),
        )
    }

    fn remove_booking(&self, id: &str) -> ClientResult<()> {
        self.call("collaboration.removeCSBooking", self.booking_params(id))?;
        Ok(())
    }

    fn start_booking(&self, id: &str) -> ClientResult<Booking> {
        self.call_booking("collaboration.startCSBooking", self.booking_params(id))
    }

    fn stop_booking(&self, id: &str) -> ClientResult<Booking> {
        self.call_booking("collaboration.stopCSBooking", self.booking_params(id))
    }

    fn check_status(&self, id: &str) -> ClientResult<Booking> {
        self.call_booking("collaboration.checkCSBookingStatus", self.booking_params(id))
    }

    fn accept_booking(&self, id: &str) -> ClientResult<Booking> {
        self.call_booking("collaboration.acceptCSBooking", self.booking_params(id))
    }

    fn reject_booking(&self, id: &str, reason: &str) -> ClientResult<Booking> {
        self.call_booking(
            "collaboration.rejectCSBooking",
            json!({"conference": self.conference_id, "bookingId": id, "reason": reason}),
        )
    }

    fn attach_booking(&self, booking_type: &str, params: &Value) -> ClientResult<Booking> {
        self.call_booking(
            "collaboration.attachCSBooking",
            json!({"conference": self.conference_id, "type": booking_type, "bookingParams": params}),
        )
    }

    fn search(&self, booking_type: &str, query: &str) -> ClientResult<Vec<SearchHit>> {
        decode(self.call(
            "collaboration.search",
            json!({
                "conference": self.conference_id,
                "type": booking_type,
                "query": query,
                "limit": SEARCH_LIMIT
            }),
        )?)
    }

    fn send_agreement(&self, request: &AgreementRequest) -> ClientResult<()> {
        self.call(
            "collaboration.sendElectronicAgreement",
            json!({
                "conference": self.conference_id,
                "uniqueIdList": request.unique_id_list,
                "from": {"email": request.from_email, "name": request.from_name},
                "cc": request.cc,
                "content": request.content
            }),
        )?;
        Ok(())
    }

    fn accept_agreement(&self, auth_key: &str) -> ClientResult<()> {
        self.call(
            "collaboration.acceptElectronicAgreement",
            json!({"confId": self.conference_id, "authKey": auth_key}),
        )?;
        Ok(())
    }

    fn reject_agreement(&self, auth_key: &str, reason: &str) -> ClientResult<()> {
        self.call(
            "collaboration.rejectElectronicAgreement",
            json!({"confId": self.conference_id, "reason": reason, "authKey": auth_key}),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_encodes_segments() {
        assert_eq!(
            endpoint("https://events.example.org/", &["event", "12", "day", "Room A/1"]),
            "https://events.example.org/event/12/day/Room%20A%2F1"
        );
    }

    #[test]
    fn test_timetable_url() {
        let backend = RpcBackend::new("https://events.example.org", "a12", Duration::from_secs(5)).unwrap();
        assert_eq!(
            backend.timetable_url(&["day", "20240513"]),
            "https://events.example.org/event/a12/manage/timetable/day/20240513"
        );
    }

    #[test]
    fn test_commit_reply_day_wins_over_entry() {
        let reply: CommitReply = serde_json::from_value(json!({"day": "20240513", "entries": {}})).unwrap();
        assert!(matches!(reply.into_response().unwrap(), CommitResponse::Day { .. }));

        let empty: CommitReply = serde_json::from_value(json!({})).unwrap();
        assert!(empty.into_response().is_err());
    }
}
