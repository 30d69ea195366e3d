use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;

use crate::models::config::AppConfig;

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "CONFERENCE_TIMETABLE_CONFIG";

const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "timetable.db";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "ConferenceTimetable", "ConferenceTimetable")
}

pub struct SettingsService {
    path: PathBuf,
}

impl SettingsService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Service for the environment override or the platform config dir
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Ok(Self::new(path));
            }
        }
        let dirs = project_dirs().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(Self::new(dirs.config_dir().join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config; a missing file yields the defaults
    pub fn load(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            log::info!("No config at {}, using defaults", self.path.display());
            return Ok(AppConfig::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config {}", self.path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", self.path.display()))?;
        config
            .validate()
            .map_err(|e| anyhow!("Invalid config: {}", e))?;
        Ok(config)
    }

    pub fn load_or_default(&self) -> AppConfig {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {:#}, using defaults", e);
                AppConfig::default()
            }
        }
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        config
            .validate()
            .map_err(|e| anyhow!("Invalid config: {}", e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }
        let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write config {}", self.path.display()))?;
        log::info!("Saved config to {}", self.path.display());
        Ok(())
    }

    pub fn reset(&self) -> Result<()> {
        self.save(&AppConfig::default())
    }
}

/// Local store location: the configured path, else a file next to the
/// binary in debug builds and in the platform data dir otherwise
pub fn database_path(config: &AppConfig) -> Result<PathBuf> {
    if let Some(path) = &config.database_path {
        return Ok(PathBuf::from(path));
    }

    #[cfg(debug_assertions)]
    {
        Ok(PathBuf::from(DATABASE_FILE_NAME))
    }

    #[cfg(not(debug_assertions))]
    {
        let dirs = project_dirs().ok_or_else(|| anyhow!("Could not determine data directory"))?;
        let data_dir = dirs.data_dir();
        fs::create_dir_all(data_dir).context("Failed to create data directory")?;
        Ok(data_dir.join(DATABASE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::view::LayoutKind;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let service = SettingsService::new(dir.path().join("config.toml"));
        assert_eq!(service.load().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let service = SettingsService::new(dir.path().join("nested").join("config.toml"));

        let config = AppConfig {
            conference_id: "a1234".to_string(),
            default_layout: LayoutKind::Room,
            timezone: "Europe/Zurich".to_string(),
            batch_delay_ms: 250,
            ..Default::default()
        };
        service.save(&config).unwrap();

        let loaded = service.load().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_config_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let service = SettingsService::new(dir.path().join("config.toml"));
        let config = AppConfig {
            day_start_hour: 30,
            ..Default::default()
        };
        assert!(service.save(&config).is_err());
        assert!(!service.path().exists());
    }

    #[test]
    fn test_unparsable_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "day_start_hour = \"eight\"").unwrap();

        let service = SettingsService::new(&path);
        assert!(service.load().is_err());
        assert_eq!(service.load_or_default(), AppConfig::default());
    }

    #[test]
    fn test_reset() {
        let dir = TempDir::new().unwrap();
        let service = SettingsService::new(dir.path().join("config.toml"));
        service
            .save(&AppConfig {
                management_mode: false,
                ..Default::default()
            })
            .unwrap();
        service.reset().unwrap();
        assert!(service.load().unwrap().management_mode);
    }

    #[test]
    #[serial]
    fn test_env_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::env::set_var(CONFIG_PATH_ENV, &path);
        let service = SettingsService::from_env().unwrap();
        std::env::remove_var(CONFIG_PATH_ENV);
        assert_eq!(service.path(), path.as_path());
    }

    #[test]
    fn test_configured_database_path_wins() {
        let config = AppConfig {
            database_path: Some("/tmp/event.db".to_string()),
            ..Default::default()
        };
        assert_eq!(database_path(&config).unwrap(), PathBuf::from("/tmp/event.db"));
    }
}
