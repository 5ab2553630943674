//! Read-only view of the session published to subscribers

use crate::sleep_timer::SleepTimerStatus;
use talebox_core::{CollectionId, Duration, PlaybackSpeed, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Empty,
    Loading,
    Paused,
    Playing,
}

impl SessionPhase {
    /// A track is open and can be played or paused
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Paused | Self::Playing)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Loaded track, or the track being loaded
    pub track: Option<Track>,
    pub collection_id: Option<CollectionId>,
    pub position: Duration,
    pub total_duration: Duration,
    pub speed: PlaybackSpeed,
    pub sleep_timer: SleepTimerStatus,
    /// Message of the most recent failure, cleared by the next successful load
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn is_playing(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    /// Fraction of the track heard, 0.0 while the duration is unknown
    pub fn progress(&self) -> f32 {
        if self.total_duration.is_zero() {
            return 0.0;
        }
        (self.position.as_millis() as f64 / self.total_duration.as_millis() as f64).min(1.0) as f32
    }
}
