// Application configuration model
// Persisted as TOML in the platform config directory

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::view::{DetailLevel, LayoutKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote server base URL; the local store is used when absent
    pub server_url: Option<String>,
    pub conference_id: String,
    /// SQLite file for the local store
    pub database_path: Option<String>,
    pub default_layout: LayoutKind,
    pub default_detail: DetailLevel,
    pub management_mode: bool,
    pub day_start_hour: u32,
    pub day_end_hour: u32,
    pub timezone: String,
    pub batch_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub use_system_theme: bool,
    pub theme: String,
    pub timetable_width: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            conference_id: "0".to_string(),
            database_path: None,
            default_layout: LayoutKind::Compact,
            default_detail: DetailLevel::Session,
            management_mode: true,
            day_start_hour: 8,
            day_end_hour: 17,
            timezone: "UTC".to_string(),
            batch_delay_ms: 1000,
            request_timeout_secs: 30,
            use_system_theme: true,
            theme: "light".to_string(),
            timetable_width: 900.0,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.day_start_hour > 23 {
            return Err(format!("day_start_hour must be 0-23, got {}", self.day_start_hour));
        }
        if self.day_end_hour > 24 || self.day_end_hour <= self.day_start_hour {
            return Err(format!(
                "day_end_hour must be after day_start_hour and at most 24, got {}",
                self.day_end_hour
            ));
        }
        if self.conference_id.trim().is_empty() {
            return Err("conference_id cannot be empty".to_string());
        }
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("server_url must be an http(s) URL: {}", url));
            }
        }
        if self.timezone.parse::<Tz>().is_err() {
            return Err(format!("Unknown timezone: {}", self.timezone));
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be positive".to_string());
        }
        if self.timetable_width < 200.0 {
            return Err("timetable_width must be at least 200".to_string());
        }
        Ok(())
    }

    /// Parsed event timezone, UTC when the name is unknown
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }

    pub fn is_dark_theme(&self) -> bool {
        self.theme.to_lowercase().contains("dark")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_day_window() {
        let config = AppConfig {
            day_start_hour: 18,
            day_end_hour: 9,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let config = AppConfig {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.tz(), Tz::UTC);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("conference_id = \"42\"\nday_start_hour = 7\n").unwrap();
        assert_eq!(config.conference_id, "42");
        assert_eq!(config.day_start_hour, 7);
        assert_eq!(config.batch_delay_ms, 1000);
        assert_eq!(config.default_layout, LayoutKind::Compact);
    }
}
