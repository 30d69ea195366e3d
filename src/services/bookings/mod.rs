//! Collaboration bookings.
//!
//! [`board::BookingBoard`] owns the panel state, [`registry::PluginRegistry`]
//! the per-type callbacks, [`request::BookingRequest`] wraps every call to the
//! backend and [`batch::BatchRunner`] drives start-all/stop-all.

pub mod batch;
pub mod board;
pub mod registry;
pub mod request;

pub use batch::{BatchAction, BatchItem, BatchRunner};
pub use board::{ActionRoute, BatchPlan, BookingBoard, ErrorReport, StartStopButtons, TableHead};
pub use registry::{BookingEvent, BrowserLauncher, ErrorPopup, Launcher, ParamContext, PluginCapabilities, PluginRegistry};
pub use request::{BookingReply, BookingRequest, ReplyOutcome};
