//! Errors raised while reading or writing the config file

use crate::validation::ValidationError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system call on the config file or its directory failed
    #[error("Could not {action} {}: {source}", .path.display())]
    Io {
        action: FileAction,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} holds no settings", .path.display())]
    Empty { path: PathBuf },

    #[error("{} is not valid TOML: {source}", .path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not encode config as TOML: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Values the session cannot run with; nothing was written
    #[error("Refusing to save invalid config: {}", summarize(.0))]
    Invalid(Vec<ValidationError>),

    #[error("This platform has no user config directory")]
    NoConfigDir,
}

/// File system step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Read,
    Write,
    CreateDirectory,
    Backup,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileAction::Read => "read",
            FileAction::Write => "write",
            FileAction::CreateDirectory => "create directory",
            FileAction::Backup => "back up",
        })
    }
}

impl ConfigError {
    /// Builds the `map_err` adapter for an I/O step on `path`
    pub(crate) fn io(action: FileAction, path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| ConfigError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The file this error is about, if it concerns one
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Io { path, .. }
            | ConfigError::Empty { path }
            | ConfigError::Syntax { path, .. } => Some(path),
            ConfigError::Encode(_) | ConfigError::Invalid(_) | ConfigError::NoConfigDir => None,
        }
    }
}

/// One line per problem, joined for logs and error messages
pub(crate) fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_step_and_file() {
        let path = PathBuf::from("/etc/talebox/config.toml");
        let err = ConfigError::io(FileAction::Backup, &path)(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        ));

        assert_eq!(
            err.to_string(),
            "Could not back up /etc/talebox/config.toml: denied"
        );
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[test]
    fn test_invalid_lists_every_field() {
        let err = ConfigError::Invalid(vec![
            ValidationError::new("player.seek_step_secs", "must be between 1 and 300")
                .with_value(0),
            ValidationError::new("app.database_path", "must not be empty"),
        ]);

        let message = err.to_string();
        assert!(message.contains("player.seek_step_secs"));
        assert!(message.contains("; app.database_path"));
        assert_eq!(err.path(), None);
    }

    #[test]
    fn test_syntax_error_names_path() {
        let source = toml::from_str::<toml::Table>("= broken").unwrap_err();
        let err = ConfigError::Syntax {
            path: PathBuf::from("/tmp/config.toml"),
            source,
        };
        assert!(err.to_string().starts_with("/tmp/config.toml is not valid TOML"));
    }
}
