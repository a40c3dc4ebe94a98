use crate::error::Result;
use crate::model::Route;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_DIR: &str = "fwportal";
const SETTINGS_FILE: &str = "settings.json";
const SUMMARY_FILE: &str = "flashSummary.json";

pub const BACKEND_URL_ENV: &str = "FWPORTAL_BACKEND_URL";
pub const LOG_LEVEL_ENV: &str = "FWPORTAL_LOG";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend_url: String,
    pub baud_rate: u32,
    pub probe_timeout_ms: u64,
    pub request_timeout_secs: u64,
    /// Ask the backend for firmware details right after a file is selected.
    /// Flashing requires those details when enabled.
    pub inspect_firmware: bool,
    pub start_path: String,
    pub summary_path: Option<PathBuf>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            backend_url: String::from("http://127.0.0.1:5000"),
            baud_rate: 115200,
            probe_timeout_ms: 1000,
            request_timeout_secs: 120,
            inspect_firmware: true,
            start_path: String::from("/"),
            summary_path: None,
            log_level: String::from("info"),
            log_file: None,
        }
    }
}

impl Settings {
    /// Loads the user settings file if there is one, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let settings = match dirs::config_dir() {
            Some(dir) => Self::from_file(&dir.join(APP_DIR).join(SETTINGS_FILE))?,
            None => Settings::default(),
        };
        Ok(settings.with_env())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            self.backend_url = url;
        }
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            self.log_level = level;
        }
        self
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn start_route(&self) -> Route {
        Route::from_path(&self.start_path).unwrap_or_else(|| {
            log::warn!("Unknown start path {:?}, showing welcome", self.start_path);
            Route::Welcome
        })
    }

    pub fn summary_path(&self) -> PathBuf {
        match &self.summary_path {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join(SUMMARY_FILE),
        }
    }
}
