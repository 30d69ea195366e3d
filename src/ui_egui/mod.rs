mod app;
pub mod commands;
pub mod gesture;
pub mod theme;
mod views;

pub use app::TimetableApp;
