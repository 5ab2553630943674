use std::path::PathBuf;
use talebox_core::AppError;
use thiserror::Error;

/// Failures reported by an audio engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    /// The read was cut short, e.g. by an audio focus change or a slow mount
    #[error("Interrupted: {0}")]
    Interrupted(String),

    #[error("Engine did not become ready within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl EngineError {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::Interrupted => Self::Interrupted(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::FileNotFound(path) => AppError::FileNotFound { path },
            EngineError::UnsupportedFormat(format) => AppError::UnsupportedFormat {
                format,
                file: PathBuf::new(),
            },
            EngineError::DecodeError(message) => AppError::AudioDecodeError {
                message,
                source: None,
            },
            EngineError::OutputError(message) => AppError::PlaybackDeviceError { message },
            EngineError::Io(message) => AppError::IoError {
                source: std::io::Error::other(message.clone()),
                message,
            },
            EngineError::Interrupted(message) => AppError::IoError {
                source: std::io::Error::new(std::io::ErrorKind::Interrupted, message.clone()),
                message,
            },
            other @ (EngineError::Timeout(_) | EngineError::InvalidState(_)) => {
                AppError::InternalError {
                    message: other.to_string(),
                }
            }
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
