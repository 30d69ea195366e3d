//! Background request dispatch.
//!
//! Backend calls block, so each one runs on its own thread and reports back
//! over a channel. The UI polls the channel once per frame.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::errors::ClientResult;
use crate::models::booking::Booking;
use crate::models::commit::{CommitRequest, CommitResponse, MoveToSession};
use crate::models::entry::{DayEntries, TimetableData};
use crate::services::backend::{BookingBackend, TimetableBackend};
use crate::services::bookings::{BookingReply, BookingRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    FetchTimetable,
    FetchDay(String),
    Commit(CommitRequest),
    MoveToSession(MoveToSession),
    ListBookings,
    Booking(BookingRequest),
}

impl Job {
    pub fn describe(&self) -> String {
        match self {
            Job::FetchTimetable => "Loading timetable".to_string(),
            Job::FetchDay(day) => format!("Loading day {}", day),
            Job::Commit(request) => format!("Moving entry {}", request.entry_id),
            Job::MoveToSession(request) => format!("Moving entry {} to session {}", request.entry_id, request.session_id),
            Job::ListBookings => "Loading bookings".to_string(),
            Job::Booking(request) => request.progress_text().to_string(),
        }
    }
}

#[derive(Debug)]
pub enum JobResult {
    Timetable(ClientResult<TimetableData>),
    Day {
        day: String,
        result: ClientResult<DayEntries>,
    },
    Commit {
        request: CommitRequest,
        result: ClientResult<CommitResponse>,
    },
    MovedToSession {
        request: MoveToSession,
        result: ClientResult<DayEntries>,
    },
    Bookings(ClientResult<Vec<Booking>>),
    Booking {
        request: BookingRequest,
        result: ClientResult<BookingReply>,
    },
}

/// Run a job on the calling thread
pub fn run_job(job: Job, timetable: &dyn TimetableBackend, bookings: &dyn BookingBackend) -> JobResult {
    match job {
        Job::FetchTimetable => JobResult::Timetable(timetable.fetch_timetable()),
        Job::FetchDay(day) => {
            let result = timetable.fetch_day(&day);
            JobResult::Day { day, result }
        }
        Job::Commit(request) => {
            let result = timetable.commit_move(&request);
            JobResult::Commit { request, result }
        }
        Job::MoveToSession(request) => {
            let result = timetable.move_to_session(&request);
            JobResult::MovedToSession { request, result }
        }
        Job::ListBookings => JobResult::Bookings(bookings.list_bookings()),
        Job::Booking(request) => {
            let result = request.execute(bookings);
            JobResult::Booking { request, result }
        }
    }
}

pub struct Dispatcher {
    timetable: Arc<dyn TimetableBackend>,
    bookings: Arc<dyn BookingBackend>,
    tx: Sender<JobResult>,
    rx: Receiver<JobResult>,
    in_flight: usize,
    repaint: Option<egui::Context>,
}

impl Dispatcher {
    pub fn new(timetable: Arc<dyn TimetableBackend>, bookings: Arc<dyn BookingBackend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            timetable,
            bookings,
            tx,
            rx,
            in_flight: 0,
            repaint: None,
        }
    }

    /// Wake the UI whenever a result arrives
    pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    pub fn booking_backend(&self) -> Arc<dyn BookingBackend> {
        Arc::clone(&self.bookings)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn submit(&mut self, job: Job) {
        log::debug!("Dispatching: {}", job.describe());
        self.in_flight += 1;

        let timetable = Arc::clone(&self.timetable);
        let bookings = Arc::clone(&self.bookings);
        let tx = self.tx.clone();
        let repaint = self.repaint.clone();

        thread::spawn(move || {
            let result = run_job(job, timetable.as_ref(), bookings.as_ref());
            if tx.send(result).is_err() {
                log::debug!("Dispatcher dropped before the result arrived");
            }
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        });
    }

    /// Results that arrived since the last call
    pub fn poll(&mut self) -> Vec<JobResult> {
        let results: Vec<JobResult> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(results.len());
        results
    }

    /// Block until one result arrives or the timeout passes
    pub fn wait(&mut self, timeout: Duration) -> Option<JobResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
