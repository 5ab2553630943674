//! The config file on disk
//!
//! Saves stage the TOML in a temporary file beside the target and rename it
//! into place. The file being replaced is copied to `config.toml.bak` first.

use crate::error::{summarize, ConfigError, ConfigResult, FileAction};
use crate::{Config, CONFIG_VERSION};
use std::cmp::Ordering;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("toml.bak")
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the file; `None` when none was written yet
    ///
    /// A file from an older format version is rewritten at the current one.
    /// Out-of-range values are logged and returned as they are, so a
    /// hand-edited file can still be inspected and fixed.
    pub fn read(&self) -> ConfigResult<Option<Config>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::io(FileAction::Read, &self.path)(e)),
        };

        if text.trim().is_empty() {
            return Err(ConfigError::Empty {
                path: self.path.clone(),
            });
        }

        let mut config: Config = toml::from_str(&text).map_err(|source| ConfigError::Syntax {
            path: self.path.clone(),
            source,
        })?;

        match config.version.cmp(&CONFIG_VERSION) {
            Ordering::Less => {
                // Missing sections were already filled in with defaults
                log::info!(
                    "Upgrading {} from version {} to {}",
                    self.path.display(),
                    config.version,
                    CONFIG_VERSION
                );
                config.version = CONFIG_VERSION;
                if let Err(e) = self.write(&config) {
                    log::warn!("Keeping the old file: {}", e);
                }
            }
            Ordering::Greater => log::warn!(
                "{} has version {}, newer than {}",
                self.path.display(),
                config.version,
                CONFIG_VERSION
            ),
            Ordering::Equal => {}
        }

        if let Err(errors) = config.validate() {
            log::warn!(
                "{} has invalid values: {}",
                self.path.display(),
                summarize(&errors)
            );
        }

        Ok(Some(config))
    }

    /// Validates `config` and replaces the file with it
    pub fn write(&self, config: &Config) -> ConfigResult<()> {
        config.validate().map_err(ConfigError::Invalid)?;
        let text = toml::to_string_pretty(config)?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(ConfigError::io(FileAction::CreateDirectory, dir))?;

        if self.exists() {
            fs::copy(&self.path, self.backup_path())
                .map_err(ConfigError::io(FileAction::Backup, &self.path))?;
        }

        let mut staged = tempfile::Builder::new()
            .prefix(".config")
            .suffix(".toml.tmp")
            .tempfile_in(dir)
            .map_err(ConfigError::io(FileAction::Write, dir))?;
        staged
            .write_all(text.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(ConfigError::io(FileAction::Write, staged.path()))?;
        staged
            .persist(&self.path)
            .map_err(|e| ConfigError::io(FileAction::Write, &self.path)(e.error))?;

        log::info!("Saved config to {}", self.path.display());
        Ok(())
    }
}
