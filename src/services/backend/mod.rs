//! Server access.
//!
//! The UI talks to the server only through these traits. [`rpc::RpcBackend`]
//! speaks JSON-RPC and REST to a remote server; [`local::LocalBackend`] keeps
//! everything in a SQLite file.

pub mod envelope;
pub mod local;
pub mod rpc;

use serde_json::Value;

use crate::errors::ClientResult;
use crate::models::booking::{AgreementRequest, Booking, SearchHit};
use crate::models::commit::{CommitRequest, CommitResponse, MoveToSession};
use crate::models::entry::{DayEntries, TimetableData};

/// Maximum hits returned by a booking search
pub const SEARCH_LIMIT: usize = 10;

#[cfg_attr(test, mockall::automock)]
pub trait TimetableBackend: Send + Sync {
    /// Every day of the event
    fn fetch_timetable(&self) -> ClientResult<TimetableData>;

    fn fetch_day(&self, day: &str) -> ClientResult<DayEntries>;

    fn commit_move(&self, request: &CommitRequest) -> ClientResult<CommitResponse>;

    /// Returns the day as it is after the move
    fn move_to_session(&self, request: &MoveToSession) -> ClientResult<DayEntries>;
}

#[cfg_attr(test, mockall::automock)]
pub trait BookingBackend: Send + Sync {
    fn list_bookings(&self) -> ClientResult<Vec<Booking>>;

    fn create_booking(&self, booking_type: &str, params: &Value) -> ClientResult<Booking>;

    fn edit_booking(&self, id: &str, params: &Value) -> ClientResult<Booking>;

    fn remove_booking(&self, id: &str) -> ClientResult<()>;

    fn start_booking(&self, id: &str) -> ClientResult<Booking>;

    fn stop_booking(&self, id: &str) -> ClientResult<Booking>;

    fn check_status(&self, id: &str) -> ClientResult<Booking>;

    fn accept_booking(&self, id: &str) -> ClientResult<Booking>;

    fn reject_booking(&self, id: &str, reason: &str) -> ClientResult<Booking>;

    /// Attach an existing remote room found by [`BookingBackend::search`]
    fn attach_booking(&self, booking_type: &str, params: &Value) -> ClientResult<Booking>;

    fn search(&self, booking_type: &str, query: &str) -> ClientResult<Vec<SearchHit>>;

    fn send_agreement(&self, request: &AgreementRequest) -> ClientResult<()>;

    fn accept_agreement(&self, auth_key: &str) -> ClientResult<()>;

    fn reject_agreement(&self, auth_key: &str, reason: &str) -> ClientResult<()>;
}
