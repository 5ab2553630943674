//! Lead-in and lead-out resolution for a track

use talebox_core::{Collection, Duration, Track};

/// Where playback of one track starts and when it counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkipPolicy {
    /// Position playback starts from when nothing later was saved
    pub lead_in: Duration,
    /// Completion fires once the remaining time drops to this value; `None` disables it
    pub lead_out: Option<Duration>,
}

impl SkipPolicy {
    /// Resolves the policy of `track` within `collection`
    ///
    /// The lead-in never reaches the end of the track. A lead-out as long as
    /// the track (or a track of unknown length) is disabled, otherwise the
    /// track would complete the moment it starts.
    pub fn resolve(collection: &Collection, track: &Track) -> Self {
        Self::for_length(collection, track.duration)
    }

    /// Resolves the policy against the length the engine actually reported
    pub fn for_length(collection: &Collection, duration: Duration) -> Self {
        let skip_start = Duration::from_seconds(collection.skip_start_secs as u64);
        let skip_end = Duration::from_seconds(collection.skip_end_secs as u64);

        let lead_in = if duration.is_zero() {
            Duration::ZERO
        } else {
            skip_start.min(duration.saturating_sub(Duration::from_millis(1)))
        };

        let lead_out = if skip_end.is_zero() || skip_end >= duration {
            None
        } else {
            Some(skip_end)
        };

        Self { lead_in, lead_out }
    }

    /// True once `position` is within the lead-out of a track lasting `total`
    pub fn in_lead_out(&self, position: Duration, total: Duration) -> bool {
        match self.lead_out {
            Some(threshold) if !total.is_zero() && threshold < total => {
                total.saturating_sub(position) <= threshold
            }
            _ => false,
        }
    }
}
