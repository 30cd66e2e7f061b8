//! Configuration management for micmute.
//!
//! The hotkey is kept as a string here; parsing it needs the platform hotkey
//! library and happens in the app.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::APP_NAME;

/// Default global shortcut for toggling the microphone.
pub const DEFAULT_HOTKEY: &str = "alt+shift+KeyM";

/// User configuration, stored as TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Global toggle shortcut, e.g. "alt+shift+KeyM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,

    /// How long after a toggle further toggles and device changes are ignored
    #[serde(
        default = "default_grace_period_ms",
        skip_serializing_if = "is_default_grace_period_ms"
    )]
    pub grace_period_ms: u64,

    /// Also mute virtual and aggregate devices
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_virtual_devices: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn default_grace_period_ms() -> u64 {
    300
}

fn is_default_grace_period_ms(v: &u64) -> bool {
    *v == default_grace_period_ms()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: None,
            grace_period_ms: default_grace_period_ms(),
            include_virtual_devices: false,
        }
    }
}

impl Config {
    /// The configured hotkey string, or the default one.
    pub fn hotkey(&self) -> &str {
        self.hotkey.as_deref().unwrap_or(DEFAULT_HOTKEY)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a new ConfigManager with a specified configuration directory.
    pub fn with_config_dir<P: AsRef<std::path::Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the configuration from the config file or returns default.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        if config.grace_period_ms == 0 {
            warn!("grace_period_ms is 0, rapid clicks may toggle the microphone twice");
        }

        Ok(config)
    }

    /// Saves the configuration to the config file, only writing non-default fields.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }
}
