//! Talebox configuration
//!
//! Each feature owns a section type implementing [`ConfigSection`]. The root
//! [`Config`] aggregates the sections and is persisted as TOML with atomic
//! writes.
//!
//! # Example
//!
//! ```rust,no_run
//! use talebox_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Speed: {}", config.player.default_speed);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

pub mod app_config;
mod player_config;
mod sleep_timer_config;

pub use error::{ConfigError, ConfigResult, FileAction};
pub use manager::ConfigManager;
pub use persistence::ConfigFile;
pub use validation::{ConfigSection, ValidationError, Validator};

pub use app_config::{AppConfig, LogLevel};
pub use player_config::PlayerConfig;
pub use sleep_timer_config::SleepTimerConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Playback session behavior
    pub player: PlayerConfig,

    /// Sleep timer presets
    pub sleep_timer: SleepTimerConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.player.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.sleep_timer.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    ///
    /// Override chain: defaults < file < env vars.
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.player.merge(other.player);
        self.sleep_timer.merge(other.sleep_timer);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            player: PlayerConfig::default(),
            sleep_timer: SleepTimerConfig::default(),
        }
    }
}
