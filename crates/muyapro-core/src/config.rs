//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! where the durable cache lives, whether sample data is seeded, and the
//! latencies of the simulated services.
//!
//! Configuration is stored at `~/.config/muyapro/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::simulation::{OtpService, DEFAULT_ASSIGNMENT_DELAY_MS, DEFAULT_OTP_DELAY_MS};
use crate::store::{StoreOptions, DEFAULT_SUPPORT_REPLY_DELAY_MS};

/// Application name used for config/data directory paths
const APP_NAME: &str = "muyapro";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides the platform data directory
    pub data_dir: Option<PathBuf>,
    pub seed_sample_data: bool,
    pub support_reply_delay_ms: u64,
    pub assignment_delay_ms: u64,
    pub otp_delay_ms: u64,
    /// Also write logs to this file
    pub log_file: Option<PathBuf>,
    pub last_phone: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            seed_sample_data: false,
            support_reply_delay_ms: DEFAULT_SUPPORT_REPLY_DELAY_MS,
            assignment_delay_ms: DEFAULT_ASSIGNMENT_DELAY_MS,
            otp_delay_ms: DEFAULT_OTP_DELAY_MS,
            log_file: None,
            last_phone: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the durable cache files
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            seed_sample_data: self.seed_sample_data,
            support_reply_delay: Duration::from_millis(self.support_reply_delay_ms),
        }
    }

    pub fn otp_service(&self) -> OtpService {
        OtpService::new(Duration::from_millis(self.otp_delay_ms))
    }

    pub fn assignment_delay(&self) -> Duration {
        Duration::from_millis(self.assignment_delay_ms)
    }
}
