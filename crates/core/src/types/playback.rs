//! Playback-related domain models

use crate::types::{Duration, Timestamp, TrackId, Validator};
use serde::{Deserialize, Serialize};

/// Slowest supported playback speed
pub const MIN_SPEED: f32 = 0.5;
/// Fastest supported playback speed
pub const MAX_SPEED: f32 = 3.0;

/// Playback speed multiplier with pitch correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSpeed {
    speed: f32,
    pitch_correction: bool,
}

impl PlaybackSpeed {
    /// Creates a new playback speed (0.5x - 3.0x)
    pub fn new(speed: f32) -> Result<Self, String> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            Err(format!(
                "Speed must be between {} and {}",
                MIN_SPEED, MAX_SPEED
            ))
        } else {
            Ok(Self {
                speed,
                pitch_correction: true,
            })
        }
    }

    /// Creates a playback speed without validation (for rows read from the store)
    pub fn new_unchecked(speed: f32) -> Self {
        Self {
            speed,
            pitch_correction: true,
        }
    }

    /// Creates a playback speed, clamping out-of-range values
    pub fn clamped(speed: f32) -> Self {
        let speed = if speed.is_finite() { speed } else { 1.0 };
        Self::new_unchecked(speed.clamp(MIN_SPEED, MAX_SPEED))
    }

    /// Returns the speed value
    pub fn value(&self) -> f32 {
        self.speed
    }

    /// Returns true if pitch correction is enabled
    pub fn has_pitch_correction(&self) -> bool {
        self.pitch_correction
    }

    /// Sets pitch correction
    pub fn with_pitch_correction(mut self, enabled: bool) -> Self {
        self.pitch_correction = enabled;
        self
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch_correction: true,
        }
    }
}

impl Validator for PlaybackSpeed {
    fn validate(&self) -> Result<(), Vec<String>> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            Err(vec![format!(
                "Speed must be between {} and {}",
                MIN_SPEED, MAX_SPEED
            )])
        } else {
            Ok(())
        }
    }
}

/// Last saved listening position for one track
///
/// One record per track; a newer save replaces the older one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub track_id: TrackId,
    pub position: Duration,
    /// Track duration as known when the record was written
    pub duration: Duration,
    pub speed: PlaybackSpeed,
    pub saved_at: Timestamp,
}

impl PositionRecord {
    /// Creates a record stamped with the current time
    pub fn new(track_id: TrackId, position: Duration, duration: Duration, speed: PlaybackSpeed) -> Self {
        Self::at(track_id, position, duration, speed, Timestamp::now())
    }

    /// Creates a record with an explicit save time
    pub fn at(
        track_id: TrackId,
        position: Duration,
        duration: Duration,
        speed: PlaybackSpeed,
        saved_at: Timestamp,
    ) -> Self {
        Self {
            track_id,
            position,
            duration,
            speed,
            saved_at,
        }
    }

    /// Fraction of the track already heard, 0.0 when the duration is unknown
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 0.0;
        }
        (self.position.as_millis() as f64 / self.duration.as_millis() as f64).min(1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_speed_default() {
        let speed = PlaybackSpeed::default();
        assert_eq!(speed.value(), 1.0);
        assert!(speed.has_pitch_correction());
    }

    #[test]
    fn test_playback_speed_new_valid() {
        let speed = PlaybackSpeed::new(1.5).unwrap();
        assert_eq!(speed.value(), 1.5);
    }

    #[test]
    fn test_playback_speed_new_invalid() {
        assert!(PlaybackSpeed::new(0.3).is_err());
        assert!(PlaybackSpeed::new(3.5).is_err());
    }

    #[test]
    fn test_playback_speed_clamped() {
        assert_eq!(PlaybackSpeed::clamped(9.0).value(), MAX_SPEED);
        assert_eq!(PlaybackSpeed::clamped(0.1).value(), MIN_SPEED);
        assert_eq!(PlaybackSpeed::clamped(f32::NAN).value(), 1.0);
    }

    #[test]
    fn test_playback_speed_validation() {
        assert!(PlaybackSpeed::new(2.0).unwrap().is_valid());
        assert!(!PlaybackSpeed::new_unchecked(5.0).is_valid());
    }

    #[test]
    fn test_position_record_progress() {
        let record = PositionRecord::new(
            TrackId::new(),
            Duration::from_seconds(30),
            Duration::from_seconds(120),
            PlaybackSpeed::default(),
        );
        assert_eq!(record.progress(), 0.25);
    }

    #[test]
    fn test_position_record_progress_unknown_duration() {
        let record = PositionRecord::new(
            TrackId::new(),
            Duration::from_seconds(30),
            Duration::ZERO,
            PlaybackSpeed::default(),
        );
        assert_eq!(record.progress(), 0.0);
    }
}
