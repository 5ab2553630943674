//! Talebox core domain types and errors

pub mod error;
pub mod types;

pub use error::{AppError, ErrorSeverity, RecoveryAction, Result};
pub use types::{
    Collection, CollectionId, Duration, PlaybackSpeed, PositionRecord, Timestamp, Track, TrackId,
    Validator,
};
