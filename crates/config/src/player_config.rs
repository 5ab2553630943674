//! Player configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Playback session behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Speed applied to tracks without a saved position (0.5 - 3.0)
    pub default_speed: f32,

    /// Minimum spacing between periodic position saves, in seconds
    pub position_save_interval_secs: u64,

    /// Window after a seek during which far-off position reports are ignored
    pub seek_settle_ms: u64,

    /// How long a track may stay in loading before the load is failed
    pub load_timeout_secs: u64,

    /// Retries for transient open failures such as an interrupted read
    pub transient_retries: u32,

    /// Step used by relative seek intents
    pub seek_step_secs: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_speed: 1.0,
            position_save_interval_secs: 10,
            seek_settle_ms: 750,
            load_timeout_secs: 15,
            transient_retries: 1,
            seek_step_secs: 30,
        }
    }
}

impl ConfigSection for PlayerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.default_speed, 0.5, 3.0, "player.default_speed"),
            Validator::in_range(
                self.position_save_interval_secs,
                1,
                300,
                "player.position_save_interval_secs",
            ),
            Validator::in_range(self.seek_settle_ms, 0, 5000, "player.seek_settle_ms"),
            Validator::in_range(self.load_timeout_secs, 1, 120, "player.load_timeout_secs"),
            Validator::in_range(self.transient_retries, 0, 3, "player.transient_retries"),
            Validator::in_range(self.seek_step_secs, 1, 300, "player.seek_step_secs"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.default_speed = other.default_speed;
        self.position_save_interval_secs = other.position_save_interval_secs;
        self.seek_settle_ms = other.seek_settle_ms;
        self.load_timeout_secs = other.load_timeout_secs;
        self.transient_retries = other.transient_retries;
        self.seek_step_secs = other.seek_step_secs;
    }

    fn section_name(&self) -> &'static str {
        "player"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.section_name(), "player");
    }

    #[test]
    fn test_invalid_speed() {
        let config = PlayerConfig {
            default_speed: 3.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_save_interval_is_invalid() {
        let config = PlayerConfig {
            position_save_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seek_settle_may_be_disabled() {
        let config = PlayerConfig {
            seek_settle_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge() {
        let mut base = PlayerConfig::default();
        let other = PlayerConfig {
            transient_retries: 3,
            seek_step_secs: 10,
            ..Default::default()
        };

        base.merge(other);
        assert_eq!(base.transient_retries, 3);
        assert_eq!(base.seek_step_secs, 10);
    }

    #[test]
    fn test_multiple_validation_errors() {
        let config = PlayerConfig {
            default_speed: 0.1,
            load_timeout_secs: 0,
            transient_retries: 9,
            ..Default::default()
        };

        assert_eq!(config.validate().unwrap_err().len(), 3);
    }
}
