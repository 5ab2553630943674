//! Media Engine - the audio engine boundary used by Talebox sessions
//!
//! Decoding and output live behind [`AudioEngine`]. A session drives the
//! engine with synchronous commands and listens to [`EngineEvent`]s, each
//! tagged with the [`Generation`] of the `open` it belongs to.

mod engine;
mod error;
mod events;

pub use engine::AudioEngine;
pub use error::{EngineError, EngineResult};
pub use events::{EngineEvent, EventReceiver, EventSender, Generation, ProcessingState};
pub use talebox_core::PlaybackSpeed;

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = EngineError::UnsupportedFormat("wma".into());
        assert!(format!("{}", error).contains("wma"));
    }

    #[test]
    fn test_default_processing_state() {
        assert_eq!(ProcessingState::default(), ProcessingState::Idle);
    }
}
