//! Time types and validation shared across domain models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock instant in milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp for the current moment
    ///
    /// A system clock set before the epoch yields timestamp 0 rather than a panic.
    pub fn now() -> Self {
        Self(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_else(|_| std::time::Duration::from_secs(0))
                .as_millis() as i64,
        )
    }

    /// Creates a timestamp from milliseconds since the Unix epoch
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the Unix epoch
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns a timestamp shifted forward by `duration`
    pub fn plus(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_millis() as i64))
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later
    pub fn since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0).max(0) as u64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-negative span of media or wall time, in milliseconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Duration(u64);

impl Duration {
    /// Zero duration constant
    pub const ZERO: Self = Self(0);

    /// Creates a duration from milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Creates a duration from seconds
    pub fn from_seconds(seconds: u64) -> Self {
        Self(seconds.saturating_mul(1000))
    }

    /// Creates a duration from minutes
    pub fn from_minutes(minutes: u64) -> Self {
        Self(minutes.saturating_mul(60_000))
    }

    /// Returns the duration in milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns the duration in whole seconds
    pub fn as_seconds(&self) -> u64 {
        self.0 / 1000
    }

    /// Returns true if the duration is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn saturating_sub(self, other: Duration) -> Duration {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn saturating_add(self, other: Duration) -> Duration {
        Self(self.0.saturating_add(other.0))
    }

    /// Absolute difference between two durations
    pub fn abs_diff(self, other: Duration) -> Duration {
        Self(self.0.abs_diff(other.0))
    }

    /// Clamps into `[min, max]`; `max` wins if the bounds cross
    pub fn clamp_to(self, min: Duration, max: Duration) -> Duration {
        Self(self.0.max(min.0).min(max.0))
    }

    /// Formats as H:MM:SS
    pub fn as_hms(&self) -> String {
        let total_seconds = self.as_seconds();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hms())
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self(d.as_millis() as u64)
    }
}

impl From<Duration> for std::time::Duration {
    fn from(d: Duration) -> Self {
        std::time::Duration::from_millis(d.0)
    }
}

/// Trait for types that can validate themselves
pub trait Validator {
    /// Validates the instance and returns errors if invalid
    fn validate(&self) -> Result<(), Vec<String>>;

    /// Returns true if the instance is valid
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_now_is_after_epoch() {
        assert!(Timestamp::now().as_millis() > 0);
    }

    #[test]
    fn test_timestamp_since() {
        let start = Timestamp::from_millis(1_000);
        let later = Timestamp::from_millis(61_000);
        assert_eq!(later.since(start), Duration::from_seconds(60));
        assert_eq!(start.since(later), Duration::ZERO);
    }

    #[test]
    fn test_timestamp_plus() {
        let t = Timestamp::from_millis(500).plus(Duration::from_seconds(2));
        assert_eq!(t.as_millis(), 2_500);
    }

    #[test]
    fn test_duration_constructors() {
        assert_eq!(Duration::from_seconds(90).as_millis(), 90_000);
        assert_eq!(Duration::from_minutes(2).as_seconds(), 120);
        assert!(Duration::ZERO.is_zero());
    }

    #[test]
    fn test_duration_saturating_math() {
        let a = Duration::from_millis(300);
        let b = Duration::from_millis(500);
        assert_eq!(a.saturating_sub(b), Duration::ZERO);
        assert_eq!(b.saturating_sub(a), Duration::from_millis(200));
        assert_eq!(a.abs_diff(b), Duration::from_millis(200));
    }

    #[test]
    fn test_duration_clamp_to() {
        let max = Duration::from_seconds(10);
        assert_eq!(Duration::from_seconds(12).clamp_to(Duration::ZERO, max), max);
        assert_eq!(
            Duration::from_seconds(4).clamp_to(Duration::ZERO, max),
            Duration::from_seconds(4)
        );
    }

    #[test]
    fn test_duration_as_hms() {
        assert_eq!(Duration::from_seconds(3665).as_hms(), "1:01:05");
        assert_eq!(Duration::from_seconds(125).to_string(), "0:02:05");
    }

    #[test]
    fn test_duration_std_round_trip() {
        let d: Duration = std::time::Duration::from_secs(42).into();
        let back: std::time::Duration = d.into();
        assert_eq!(back.as_secs(), 42);
    }
}
