//! Domain types for Talebox
//!
//! - `collection`: Collection (book) and Track types
//! - `playback`: Playback speed and saved positions
//! - `common`: Time types and the `Validator` trait

mod collection;
mod common;
mod playback;

pub use collection::{Collection, CollectionId, Track, TrackId};
pub use common::{Duration, Timestamp, Validator};
pub use playback::{PlaybackSpeed, PositionRecord, MAX_SPEED, MIN_SPEED};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_types_are_exported() {
        let _collection_id: CollectionId = CollectionId::new();
        let _track_id: TrackId = TrackId::new();
        let _speed: PlaybackSpeed = PlaybackSpeed::default();
    }

    #[test]
    fn test_duration_formatting() {
        let d = Duration::from_seconds(3665);
        assert!(d.to_string().contains("1:01:05"));
    }
}
