// Service module exports
// Layout, drawing, persistence and booking logic behind the UI

pub mod backend;
pub mod block;
pub mod bookings;
pub mod database;
pub mod dispatch;
pub mod layout;
pub mod pdf;
pub mod quantize;
pub mod settings;
pub mod timetable;
