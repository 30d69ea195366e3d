// Application configuration

mod service;

pub use service::{database_path, SettingsService, CONFIG_PATH_ENV};
