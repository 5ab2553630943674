//! Sleep timer
//!
//! Duration timers store their start time and budget and compute what is
//! left on demand, so a suspended app still expires on time. Track-count
//! timers count natural track completions. Expiry is reported by the call
//! that causes it and happens once per active period: the move to `Expired`
//! is the only path that reports it.

use crate::error::{SessionError, SessionResult};
use talebox_core::{Duration, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepTimerMode {
    Duration {
        started_at: Timestamp,
        requested_minutes: u32,
    },
    TrackCount {
        remaining: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepTimerState {
    #[default]
    Idle,
    Active(SleepTimerMode),
    Expired,
}

/// What is left of an active timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Time(Duration),
    Tracks(u32),
}

/// Returned by the call that expired the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Expired {
    /// True when a track-count timer ran out, false for a duration timer
    pub by_track_count: bool,
}

/// Published view of the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepTimerStatus {
    #[default]
    Idle,
    Counting {
        remaining: Duration,
    },
    Tracks {
        remaining: u32,
    },
    Expired,
}

#[derive(Debug, Clone, Default)]
pub struct SleepTimer {
    state: SleepTimerState,
}

impl SleepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SleepTimerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SleepTimerState::Active(_))
    }

    pub fn is_expired(&self) -> bool {
        self.state == SleepTimerState::Expired
    }

    /// Starts a duration timer; replaces any running timer
    pub fn start_duration(&mut self, minutes: u32, now: Timestamp) -> SessionResult<()> {
        if minutes == 0 {
            return Err(SessionError::invalid("sleep timer needs at least one minute"));
        }
        self.state = SleepTimerState::Active(SleepTimerMode::Duration {
            started_at: now,
            requested_minutes: minutes,
        });
        log::debug!("Sleep timer started for {} min", minutes);
        Ok(())
    }

    /// Starts a timer that expires after `tracks` natural completions
    pub fn start_track_count(&mut self, tracks: u32) -> SessionResult<()> {
        if tracks == 0 {
            return Err(SessionError::invalid("sleep timer needs at least one track"));
        }
        self.state = SleepTimerState::Active(SleepTimerMode::TrackCount { remaining: tracks });
        log::debug!("Sleep timer started for {} track(s)", tracks);
        Ok(())
    }

    /// Remaining budget of an active timer
    pub fn remaining(&self, now: Timestamp) -> Option<Remaining> {
        match self.state {
            SleepTimerState::Active(SleepTimerMode::Duration {
                started_at,
                requested_minutes,
            }) => {
                let budget = Duration::from_minutes(requested_minutes as u64);
                Some(Remaining::Time(budget.saturating_sub(now.since(started_at))))
            }
            SleepTimerState::Active(SleepTimerMode::TrackCount { remaining }) => {
                Some(Remaining::Tracks(remaining))
            }
            _ => None,
        }
    }

    /// Expires a duration timer whose budget is used up
    pub fn tick(&mut self, now: Timestamp) -> Option<Expired> {
        match self.remaining(now) {
            Some(Remaining::Time(left)) if left.is_zero() => {
                self.state = SleepTimerState::Expired;
                log::info!("Sleep timer expired");
                Some(Expired {
                    by_track_count: false,
                })
            }
            _ => None,
        }
    }

    /// Counts one natural track completion
    pub fn on_track_completed(&mut self) -> Option<Expired> {
        let SleepTimerState::Active(SleepTimerMode::TrackCount { remaining }) = self.state else {
            return None;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.state = SleepTimerState::Expired;
            log::info!("Sleep timer expired after last counted track");
            Some(Expired {
                by_track_count: true,
            })
        } else {
            self.state = SleepTimerState::Active(SleepTimerMode::TrackCount { remaining });
            None
        }
    }

    /// Returns the timer to idle without reporting expiry
    ///
    /// Returns true if a timer was running.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = SleepTimerState::Idle;
        was_active
    }

    /// Adds minutes to a running duration timer
    ///
    /// The start time is kept, so extensions add up: remaining is always
    /// the requested total minus the time since the original start.
    pub fn extend(&mut self, minutes: u32) -> SessionResult<()> {
        match &mut self.state {
            SleepTimerState::Active(SleepTimerMode::Duration {
                requested_minutes, ..
            }) => {
                *requested_minutes = requested_minutes.saturating_add(minutes);
                log::debug!("Sleep timer extended to {} min", requested_minutes);
                Ok(())
            }
            _ => Err(SessionError::invalid(
                "only a running duration timer can be extended",
            )),
        }
    }

    pub fn status(&self, now: Timestamp) -> SleepTimerStatus {
        match (self.state, self.remaining(now)) {
            (SleepTimerState::Expired, _) => SleepTimerStatus::Expired,
            (_, Some(Remaining::Time(remaining))) => SleepTimerStatus::Counting { remaining },
            (_, Some(Remaining::Tracks(remaining))) => SleepTimerStatus::Tracks { remaining },
            _ => SleepTimerStatus::Idle,
        }
    }
}
