//! Error types and recovery strategies for Talebox
//!
//! Errors fall into three severity tiers:
//! - **Recoverable**: can be retried (locked database, interrupted I/O)
//! - **Degraded**: the affected track or feature is skipped but playback continues
//! - **Fatal**: requires user intervention (corrupted database)

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Recovery actions that can be taken when an error occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Retry the operation once
    RetryOnce,
    /// Log the failure and carry on without the result
    Ignore,
    /// Skip the affected track and leave the session where it was
    SkipItem,
    /// No automatic recovery - user intervention required
    UserIntervention,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryOnce => write!(f, "Retrying once"),
            Self::Ignore => write!(f, "Ignoring"),
            Self::SkipItem => write!(f, "Skipping item"),
            Self::UserIntervention => write!(f, "User intervention required"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be automatically recovered from
    Recoverable,
    /// Feature degraded but app can continue
    Degraded,
    /// Critical error requiring user action
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Main error type for Talebox
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Database Errors =====
    /// Database operation failed
    #[error("Database error: {message}")]
    DatabaseError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database is corrupted and needs repair
    #[error("Database corrupted: {details}")]
    DatabaseCorrupted { details: String },

    /// Database is locked by another process
    #[error("Database locked: {operation}")]
    DatabaseLocked { operation: String },

    /// Record not found in database
    #[error("Record not found: {entity} with {identifier}")]
    RecordNotFound { entity: String, identifier: String },

    // ===== Audio Errors =====
    /// Unsupported audio format
    #[error("Unsupported audio format: {format} in file {file}")]
    UnsupportedFormat { format: String, file: PathBuf },

    /// Audio decoding failed
    #[error("Audio decode error: {message}")]
    AudioDecodeError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Corrupted audio file
    #[error("Corrupted audio file: {file} - {reason}")]
    CorruptedAudioFile { file: PathBuf, reason: String },

    /// Audio playback device error
    #[error("Playback device error: {message}")]
    PlaybackDeviceError { message: String },

    /// Invalid audio position (seeking)
    #[error("Invalid audio position: {position}ms (file duration: {duration}ms)")]
    InvalidPosition { position: u64, duration: u64 },

    // ===== File System Errors =====
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// General I/O error
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: io::Error,
    },

    // ===== Generic Errors =====
    /// Invalid argument provided
    #[error("Invalid argument: {argument} - {reason}")]
    InvalidArgument { argument: String, reason: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DatabaseLocked { .. } | Self::IoError { .. } => ErrorSeverity::Recoverable,

            Self::DatabaseCorrupted { .. } => ErrorSeverity::Fatal,

            _ => ErrorSeverity::Degraded,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::DatabaseLocked { .. } | Self::IoError { .. } => RecoveryAction::RetryOnce,

            Self::DatabaseError { .. } | Self::RecordNotFound { .. } => RecoveryAction::Ignore,

            Self::UnsupportedFormat { .. }
            | Self::AudioDecodeError { .. }
            | Self::CorruptedAudioFile { .. }
            | Self::FileNotFound { .. }
            | Self::InvalidPosition { .. } => RecoveryAction::SkipItem,

            _ => RecoveryAction::UserIntervention,
        }
    }

    /// Returns a user-friendly error message suitable for display in the UI
    pub fn user_message(&self) -> String {
        match self {
            Self::DatabaseError { .. } | Self::DatabaseLocked { .. } => {
                "The library is temporarily unavailable. Please try again.".to_string()
            }
            Self::DatabaseCorrupted { .. } => {
                "The library database is damaged and needs repair.".to_string()
            }
            Self::RecordNotFound { .. } => "The requested item was not found.".to_string(),

            Self::UnsupportedFormat { format, .. } => {
                format!("This audio format ({}) is not supported.", format)
            }
            Self::AudioDecodeError { .. } => {
                "Cannot play this audio file. It may be corrupted or in an unsupported format."
                    .to_string()
            }
            Self::CorruptedAudioFile { .. } => {
                "This audio file is damaged and cannot be played.".to_string()
            }
            Self::PlaybackDeviceError { .. } => {
                "Cannot access audio playback. Please check your device settings.".to_string()
            }
            Self::InvalidPosition { .. } => {
                "Cannot seek to that position in the audio.".to_string()
            }

            Self::FileNotFound { .. } => {
                "The file was not found. It may have been moved or deleted.".to_string()
            }
            Self::IoError { .. } => "A file operation failed. Please try again.".to_string(),

            Self::InvalidArgument { .. } => "Invalid input provided.".to_string(),
            Self::InternalError { .. } => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }

    /// Returns true if this error should be logged at ERROR level
    pub fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Returns true if this error can be retried
    pub fn is_retryable(&self) -> bool {
        self.recovery_action() == RecoveryAction::RetryOnce
    }

    /// Helper to create a database error from any error type
    pub fn database<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::DatabaseError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper to create an audio decode error from any error type
    pub fn audio_decode<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::AudioDecodeError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper to create a not-found error for an entity
    pub fn not_found(entity: impl Into<String>, identifier: impl ToString) -> Self {
        Self::RecordNotFound {
            entity: entity.into(),
            identifier: identifier.to_string(),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound {
                path: PathBuf::from("unknown"),
            },
            _ => Self::IoError {
                message: err.to_string(),
                source: err,
            },
        }
    }
}
