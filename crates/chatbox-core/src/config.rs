use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::banner::DEFAULT_DISPLAY;
use crate::highlight::DEFAULT_THEME;
use crate::input::DEFAULT_MAX_ROWS;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_GREETING: &str = "Hello!";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub server_url: Option<String>,
    pub greeting: Option<String>,
    pub error_display_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub syntax_theme: Option<String>,
    pub input_max_rows: Option<u16>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            server_url: Some(DEFAULT_SERVER_URL.to_string()),
            greeting: Some(DEFAULT_GREETING.to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatbox").join("config.json"))
    }

    /// Server URL: environment first, then config, then the default
    pub fn server_url(&self) -> String {
        std::env::var("CHATBOX_SERVER_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn greeting(&self) -> &str {
        self.greeting.as_deref().unwrap_or(DEFAULT_GREETING)
    }

    pub fn error_display(&self) -> Duration {
        self.error_display_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_DISPLAY)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn syntax_theme(&self) -> &str {
        self.syntax_theme.as_deref().unwrap_or(DEFAULT_THEME)
    }

    pub fn input_max_rows(&self) -> u16 {
        self.input_max_rows.unwrap_or(DEFAULT_MAX_ROWS)
    }
}
