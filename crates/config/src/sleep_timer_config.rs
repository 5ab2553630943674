//! Sleep timer presets

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SleepTimerConfig {
    /// Minutes used when a duration timer is started without an explicit value
    pub default_minutes: u32,

    /// Tracks used when a track-count timer is started without an explicit value
    pub default_track_count: u32,

    /// Minutes added by a single extend
    pub extend_minutes: u32,
}

impl Default for SleepTimerConfig {
    fn default() -> Self {
        Self {
            default_minutes: 30,
            default_track_count: 1,
            extend_minutes: 5,
        }
    }
}

impl ConfigSection for SleepTimerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.default_minutes, 1, 720, "sleep_timer.default_minutes"),
            Validator::in_range(
                self.default_track_count,
                1,
                100,
                "sleep_timer.default_track_count",
            ),
            Validator::in_range(self.extend_minutes, 1, 120, "sleep_timer.extend_minutes"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.default_minutes = other.default_minutes;
        self.default_track_count = other.default_track_count;
        self.extend_minutes = other.extend_minutes;
    }

    fn section_name(&self) -> &'static str {
        "sleep_timer"
    }
}
