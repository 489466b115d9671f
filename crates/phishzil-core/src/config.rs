//! Configuration management for PhishZil.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/phishzil/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// Scan sequencing timings
    pub scanning: ScanningConfig,
    /// SMS intake settings
    pub sms: SmsConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML or fail validation
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PHISHZIL_STEP_INTERVAL_MS`: Override the step reveal interval
    /// - `PHISHZIL_TRANSITION_GAP_MS`: Override the gap before a stage transition
    /// - `PHISHZIL_SMS_AUTO_SCAN`: Override automatic link scans for SMS (true/false)
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Unparseable values are ignored and the configured value is kept.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("PHISHZIL_STEP_INTERVAL_MS") {
            if let Ok(ms) = val.parse() {
                self.scanning.step_interval_ms = ms;
                tracing::debug!("Override step_interval_ms from env: {}", ms);
            }
        }

        if let Some(val) = lookup("PHISHZIL_TRANSITION_GAP_MS") {
            if let Ok(ms) = val.parse() {
                self.scanning.transition_gap_ms = ms;
                tracing::debug!("Override transition_gap_ms from env: {}", ms);
            }
        }

        if let Some(val) = lookup("PHISHZIL_SMS_AUTO_SCAN") {
            if let Ok(enabled) = val.parse() {
                self.sms.auto_scan_links = enabled;
                tracing::debug!("Override sms.auto_scan_links from env: {}", enabled);
            }
        }
    }

    /// Check value constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scanning.step_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.step_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to the default location.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> ConfigResult<()> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/phishzil/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "phishzil", "phishzil").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Render scan progress as an animated bar rather than plain log lines
    pub progress_bar: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { progress_bar: true }
    }
}

/// Scan sequencing timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Delay between step reveals in milliseconds
    pub step_interval_ms: u64,
    /// Extra pause after a stage's last step before the next stage, in milliseconds
    pub transition_gap_ms: u64,
    /// Delay between scan completion and the results view, in milliseconds
    pub results_delay_ms: u64,
}

impl ScanningConfig {
    /// Step reveal interval as a `Duration`.
    #[must_use]
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    /// Transition gap as a `Duration`.
    #[must_use]
    pub fn transition_gap(&self) -> Duration {
        Duration::from_millis(self.transition_gap_ms)
    }

    /// Results delay as a `Duration`.
    #[must_use]
    pub fn results_delay(&self) -> Duration {
        Duration::from_millis(self.results_delay_ms)
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: 800,
            transition_gap_ms: 500,
            results_delay_ms: 1000,
        }
    }
}

/// SMS intake settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    /// Whether incoming messages are inspected at all
    pub enabled: bool,
    /// Start a link scan automatically when a message carries a link
    pub auto_scan_links: bool,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_scan_links: true,
        }
    }
}
