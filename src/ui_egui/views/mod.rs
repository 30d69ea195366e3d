pub mod booking_form;
pub mod booking_view;
pub mod timetable_view;

pub use booking_view::{BookingAction, BookingPanelState, BookingView};
pub use timetable_view::{TimetableAction, TimetableView};
