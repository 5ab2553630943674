//! Configuration manager - main API for config operations

use crate::persistence::ConfigFile;
use crate::{Config, ConfigError, ConfigResult, LogLevel};
use directories::ProjectDirs;
use std::path::PathBuf;

const ENV_PREFIX: &str = "TALEBOX";

/// Loads, saves and updates the configuration file
pub struct ConfigManager {
    file: ConfigFile,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a manager for the platform config directory
    ///
    /// - Linux: `~/.config/talebox/`
    /// - macOS: `~/Library/Application Support/talebox/`
    /// - Windows: `%APPDATA%\talebox\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let file = ConfigFile::new(config_dir.join("config.toml"));

        Ok(Self { file, config_dir })
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "talebox")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Resolves the database path against the config directory
    pub fn database_path(&self, config: &Config) -> PathBuf {
        if config.app.database_path.is_absolute() {
            config.app.database_path.clone()
        } else {
            self.config_dir.join(&config.app.database_path)
        }
    }

    /// Loads the configuration; a missing file yields the defaults
    pub fn load(&self) -> ConfigResult<Config> {
        match self.file.read()? {
            Some(config) => Ok(config),
            None => {
                log::info!(
                    "No config at {}, using defaults",
                    self.file.path().display()
                );
                Ok(Config::default())
            }
        }
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Validates and atomically saves the configuration
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.file.write(config)
    }

    /// Loads, applies `update_fn` and saves the result
    ///
    /// ```rust,no_run
    /// # use talebox_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.sleep_timer.default_minutes = 45;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a default config file if none exists
    ///
    /// Returns `Ok(true)` if a new file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.file.exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.save(&Config::default())?;
        log::info!("Generated default config at {}", self.config_path().display());
        Ok(true)
    }

    /// Overwrites the config file with defaults
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Returns the validation messages for the current file, empty if valid
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the configuration and applies `TALEBOX_SECTION_FIELD` overrides
    ///
    /// Example: `TALEBOX_PLAYER_DEFAULT_SPEED=1.5`
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_overrides(&mut config, |key| std::env::var(key).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

/// Applies overrides from `lookup`; unparseable values are logged and skipped
pub(crate) fn apply_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |section: &str, field: &str| {
        let key = format!("{}_{}_{}", ENV_PREFIX, section, field);
        lookup(&key).map(|value| (key, value))
    };

    if let Some((key, value)) = var("PLAYER", "DEFAULT_SPEED") {
        match value.parse::<f32>() {
            Ok(speed) => config.player.default_speed = speed,
            Err(_) => log::warn!("Ignoring {}: '{}' is not a number", key, value),
        }
    }

    if let Some((key, value)) = var("PLAYER", "POSITION_SAVE_INTERVAL_SECS") {
        match value.parse::<u64>() {
            Ok(secs) => config.player.position_save_interval_secs = secs,
            Err(_) => log::warn!("Ignoring {}: '{}' is not a whole number", key, value),
        }
    }

    if let Some((key, value)) = var("APP", "LOG_LEVEL") {
        match value.parse::<LogLevel>() {
            Ok(level) => config.app.log_level = level,
            Err(e) => log::warn!("Ignoring {}: {}", key, e),
        }
    }

    if let Some((_, value)) = var("APP", "DATABASE_PATH") {
        config.app.database_path = PathBuf::from(value);
    }
}
