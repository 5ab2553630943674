use talebox_config::{Config, PlayerConfig, SleepTimerConfig};
use talebox_core::{Duration, PlaybackSpeed};

/// Typed session behaviour, fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub default_speed: PlaybackSpeed,
    /// Minimum spacing of periodic position saves while playing
    pub save_interval: Duration,
    /// How long after a seek far-off position reports are treated as stale
    pub seek_settle: Duration,
    /// Reports further than this from the seek target count as stale
    pub seek_tolerance: Duration,
    pub load_timeout: Duration,
    pub transient_retries: u32,
    pub seek_step: Duration,
    /// Past this point, skipping back restarts the current track
    pub restart_threshold: Duration,
    pub sleep_default_minutes: u32,
    pub sleep_default_tracks: u32,
    pub sleep_extend_minutes: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&PlayerConfig> for SessionSettings {
    fn from(player: &PlayerConfig) -> Self {
        let sleep = SleepTimerConfig::default();
        Self {
            default_speed: PlaybackSpeed::clamped(player.default_speed),
            save_interval: Duration::from_seconds(player.position_save_interval_secs.max(1)),
            seek_settle: Duration::from_millis(player.seek_settle_ms),
            seek_tolerance: Duration::from_millis(1_500),
            load_timeout: Duration::from_seconds(player.load_timeout_secs.max(1)),
            transient_retries: player.transient_retries,
            seek_step: Duration::from_seconds(player.seek_step_secs),
            restart_threshold: Duration::from_seconds(3),
            sleep_default_minutes: sleep.default_minutes,
            sleep_default_tracks: sleep.default_track_count,
            sleep_extend_minutes: sleep.extend_minutes,
        }
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            sleep_default_minutes: config.sleep_timer.default_minutes,
            sleep_default_tracks: config.sleep_timer.default_track_count,
            sleep_extend_minutes: config.sleep_timer.extend_minutes,
            ..Self::from(&config.player)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_config_defaults() {
        let settings = SessionSettings::default();
        assert_eq!(settings.default_speed.value(), 1.0);
        assert_eq!(settings.save_interval, Duration::from_seconds(10));
        assert_eq!(settings.seek_settle, Duration::from_millis(750));
        assert_eq!(settings.load_timeout, Duration::from_seconds(15));
        assert_eq!(settings.transient_retries, 1);
        assert_eq!(settings.sleep_default_minutes, 30);
    }

    #[test]
    fn test_out_of_range_speed_is_clamped() {
        let player = PlayerConfig {
            default_speed: 7.0,
            ..Default::default()
        };
        assert_eq!(SessionSettings::from(&player).default_speed.value(), 3.0);
    }

    #[test]
    fn test_sleep_presets_from_config() {
        let mut config = Config::default();
        config.sleep_timer.extend_minutes = 10;
        config.player.seek_step_secs = 15;

        let settings = SessionSettings::from(&config);
        assert_eq!(settings.sleep_extend_minutes, 10);
        assert_eq!(settings.seek_step, Duration::from_seconds(15));
    }
}
