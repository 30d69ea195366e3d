// Module exports for models

pub mod booking;
pub mod commit;
pub mod config;
pub mod entry;
pub mod view;
