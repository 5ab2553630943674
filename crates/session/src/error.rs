//! Session error types

use media_engine::EngineError;
use talebox_core::{AppError, TrackId};
use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The track could not be opened; the session stays on the previous track
    #[error("Failed to load track {track}: {source}")]
    LoadFailed {
        track: TrackId,
        #[source]
        source: EngineError,
    },

    /// A newer load or a stop replaced this load before it became ready
    #[error("Load of track {track} was superseded")]
    Superseded { track: TrackId },

    #[error("No track is loaded")]
    NoTrackLoaded,

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Store error: {0}")]
    Store(#[from] AppError),

    /// The session task is gone
    #[error("Session driver has shut down")]
    DriverClosed,
}

impl SessionError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Message suitable for showing to the listener
    pub fn user_message(&self) -> String {
        match self {
            Self::LoadFailed { source, .. } | Self::Engine(source) => match source {
                EngineError::Timeout(_) => {
                    "The audio file took too long to open. Please try again.".to_string()
                }
                other => AppError::from(other.clone()).user_message(),
            },
            Self::Superseded { .. } => "Another track was selected.".to_string(),
            Self::NoTrackLoaded => "Nothing is playing.".to_string(),
            Self::InvalidRequest { reason } => format!("That action is not possible: {}", reason),
            Self::Store(err) => err.user_message(),
            Self::DriverClosed => "The player has stopped. Please restart the app.".to_string(),
        }
    }
}
