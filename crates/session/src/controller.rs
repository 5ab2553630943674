//! Playback session controller
//!
//! The controller owns the single session: what is loaded, where playback
//! is, and what happens when a track ends. It is a plain `&mut self` state
//! machine; the [`SessionDriver`](crate::SessionDriver) feeds it one intent
//! or engine event at a time.

use crate::catalog::TrackCatalog;
use crate::clock::Clock;
use crate::error::{SessionError, SessionResult};
use crate::persistence::{restore_latest_across_library, PositionStore, PositionWriter};
use crate::settings::SessionSettings;
use crate::skip_policy::SkipPolicy;
use crate::sleep_timer::{Expired, SleepTimer};
use crate::snapshot::{SessionPhase, SessionSnapshot};
use media_engine::{AudioEngine, EngineError, EngineEvent, EngineResult, Generation, ProcessingState};
use std::sync::Arc;
use talebox_core::{Collection, Duration, PlaybackSpeed, PositionRecord, Timestamp, Track, TrackId};
use tokio::sync::watch;

/// What ended a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTrigger {
    /// The engine reached the end of the file
    EngineCompleted,
    /// The remaining time dropped into the collection's lead-out
    LeadOut,
}

/// Completion state of the loaded track, reset by every load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackCompletion {
    #[default]
    Listening,
    Completed(CompletionTrigger),
}

/// Result of a load request that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTicket {
    /// The track was already loaded; playback resumed
    AlreadyLoaded,
    /// The engine is opening the track; the outcome arrives later
    Opening(Generation),
}

/// Final result of a load, reported once per generation
#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: Generation,
    pub result: SessionResult<()>,
}

#[derive(Debug, Clone)]
pub enum SleepTimerRequest {
    /// Pause after this many minutes; `None` uses the configured default
    Duration { minutes: Option<u32> },
    /// Stop after this many tracks end; `None` uses the configured default
    TrackCount { tracks: Option<u32> },
}

#[derive(Debug, Clone, Copy)]
struct SeekWindow {
    target: Duration,
    until: Timestamp,
}

#[derive(Debug, Clone)]
struct LoadedTrack {
    track: Track,
    collection: Collection,
    policy: SkipPolicy,
    position: Duration,
    total: Duration,
    completion: TrackCompletion,
    seek_window: Option<SeekWindow>,
    last_saved_at: Option<Timestamp>,
    /// The engine no longer holds this track, e.g. after a failed load of another one
    needs_reopen: bool,
}

#[derive(Debug)]
struct PendingLoad {
    generation: Generation,
    track: Track,
    collection: Collection,
    policy: SkipPolicy,
    restore: Option<Duration>,
    started_at: Timestamp,
    retries_left: u32,
    autoplay: bool,
    /// Speed to apply once the track is ready, e.g. the one saved with it
    speed: Option<PlaybackSpeed>,
    /// Track to fall back to if this load fails
    previous: Option<LoadedTrack>,
}

pub struct SessionController<E: AudioEngine> {
    engine: E,
    catalog: Arc<dyn TrackCatalog>,
    store: Arc<dyn PositionStore>,
    writer: PositionWriter,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    sleep_timer: SleepTimer,
    speed: PlaybackSpeed,
    generation: Generation,
    phase: SessionPhase,
    current: Option<LoadedTrack>,
    pending: Option<PendingLoad>,
    last_error: Option<String>,
    outcomes: Vec<LoadOutcome>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<E: AudioEngine> SessionController<E> {
    /// Creates an empty session
    ///
    /// Must be called within a Tokio runtime: the position writer task is
    /// spawned here.
    pub fn new(
        engine: E,
        catalog: Arc<dyn TrackCatalog>,
        store: Arc<dyn PositionStore>,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Self {
        let (writer, _) = PositionWriter::spawn(store.clone());
        let speed = settings.default_speed;
        let (snapshot_tx, _) = watch::channel(SessionSnapshot {
            speed,
            ..Default::default()
        });

        Self {
            engine,
            catalog,
            store,
            writer,
            clock,
            settings,
            sleep_timer: SleepTimer::new(),
            speed,
            generation: Generation::INITIAL,
            phase: SessionPhase::Empty,
            current: None,
            pending: None,
            last_error: None,
            outcomes: Vec::new(),
            snapshot_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn sleep_timer(&self) -> &SleepTimer {
        &self.sleep_timer
    }

    /// The loaded track; `None` while empty or loading
    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref().map(|c| &c.track)
    }

    pub fn position(&self) -> Duration {
        self.current.as_ref().map_or(Duration::ZERO, |c| c.position)
    }

    pub fn completion(&self) -> TrackCompletion {
        self.current
            .as_ref()
            .map_or(TrackCompletion::Listening, |c| c.completion)
    }

    /// Drains the outcomes of loads finished since the last call
    pub fn take_load_outcomes(&mut self) -> Vec<LoadOutcome> {
        std::mem::take(&mut self.outcomes)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.clock.now();
        let (track, collection_id, position, total_duration) = match (&self.pending, &self.current)
        {
            (Some(pending), _) => (
                Some(pending.track.clone()),
                Some(pending.collection.id),
                pending.restore.unwrap_or(pending.policy.lead_in),
                pending.track.duration,
            ),
            (None, Some(current)) => (
                Some(current.track.clone()),
                Some(current.collection.id),
                current.position,
                current.total,
            ),
            (None, None) => (None, None, Duration::ZERO, Duration::ZERO),
        };

        SessionSnapshot {
            phase: self.phase,
            track,
            collection_id,
            position,
            total_duration,
            speed: self.speed,
            sleep_timer: self.sleep_timer.status(now),
            last_error: self.last_error.clone(),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.snapshot_tx.send_if_modified(|published| {
            if *published == snapshot {
                false
            } else {
                *published = snapshot;
                true
            }
        });
    }

    // ===== Intents =====

    /// Loads `track` and starts playing it
    ///
    /// Loading the track that is already loaded resumes it instead. A load
    /// issued while another is in flight supersedes it.
    pub async fn load(&mut self, track: Track, collection: Collection) -> SessionResult<LoadTicket> {
        if let Some(pending) = self.pending.as_mut() {
            if pending.track.id == track.id {
                pending.autoplay = true;
                return Ok(LoadTicket::Opening(pending.generation));
            }
        }

        let same_track = self
            .current
            .as_ref()
            .is_some_and(|c| c.track.id == track.id && !c.needs_reopen);
        if same_track && self.phase.is_ready() {
            self.resume().await?;
            return Ok(LoadTicket::AlreadyLoaded);
        }

        self.begin_load(track, collection, true, None)
            .await
            .map(LoadTicket::Opening)
    }

    pub async fn resume(&mut self) -> SessionResult<()> {
        match self.phase {
            SessionPhase::Empty => Err(SessionError::NoTrackLoaded),
            SessionPhase::Playing => Ok(()),
            SessionPhase::Loading => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.autoplay = true;
                }
                Ok(())
            }
            SessionPhase::Paused => {
                if self.sleep_timer.is_expired() {
                    self.sleep_timer.cancel();
                }

                let Some(current) = self.current.as_ref() else {
                    return Err(SessionError::NoTrackLoaded);
                };

                if current.needs_reopen {
                    let (track, collection, position) = (
                        current.track.clone(),
                        current.collection.clone(),
                        current.position,
                    );
                    log::debug!("Reopening {} at {}", track.name, position);
                    self.begin_load(track, collection, true, Some(position))
                        .await?;
                    return Ok(());
                }

                if matches!(current.completion, TrackCompletion::Completed(_)) {
                    return self.continue_after_completion().await;
                }

                self.engine.play()?;
                self.phase = SessionPhase::Playing;
                self.publish();
                Ok(())
            }
        }
    }

    /// Pauses playback and waits until the position is stored
    pub async fn pause(&mut self) -> SessionResult<()> {
        match self.phase {
            SessionPhase::Empty => Err(SessionError::NoTrackLoaded),
            SessionPhase::Loading => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.autoplay = false;
                }
                Ok(())
            }
            SessionPhase::Playing => {
                self.engine.pause()?;
                self.phase = SessionPhase::Paused;
                self.persist_and_wait().await;
                self.publish();
                Ok(())
            }
            SessionPhase::Paused => {
                self.persist_and_wait().await;
                Ok(())
            }
        }
    }

    /// Moves to `target`, clamped to the track
    ///
    /// The session position changes immediately; engine reports that
    /// disagree with it are ignored for a short settle window.
    pub async fn seek(&mut self, target: Duration) -> SessionResult<()> {
        if self.phase == SessionPhase::Loading {
            if let Some(pending) = self.pending.as_mut() {
                pending.restore = Some(target);
            }
            self.publish();
            return Ok(());
        }

        let now = self.clock.now();
        let settle = self.settings.seek_settle;
        let Some(current) = self.current.as_mut() else {
            return Err(SessionError::NoTrackLoaded);
        };

        let target = if current.total.is_zero() {
            target
        } else {
            target.min(current.total)
        };

        if !current.needs_reopen {
            self.engine.seek(target)?;
        }
        current.position = target;
        current.seek_window = Some(SeekWindow {
            target,
            until: now.plus(settle),
        });

        // Rewinding out of a finished ending makes the track playable again
        if matches!(current.completion, TrackCompletion::Completed(_))
            && target < current.total
            && !current.policy.in_lead_out(target, current.total)
        {
            current.completion = TrackCompletion::Listening;
        }

        log::debug!("Seek to {}", target);
        self.publish();
        Ok(())
    }

    /// Seeks relative to the current position
    pub async fn seek_by(&mut self, delta_ms: i64) -> SessionResult<()> {
        let base = match (&self.pending, &self.current) {
            (Some(pending), _) => pending.restore.unwrap_or(pending.policy.lead_in),
            (None, Some(current)) => current.position,
            (None, None) => return Err(SessionError::NoTrackLoaded),
        };

        let delta = Duration::from_millis(delta_ms.unsigned_abs());
        let target = if delta_ms < 0 {
            base.saturating_sub(delta)
        } else {
            base.saturating_add(delta)
        };
        self.seek(target).await
    }

    /// Skips back by the configured step
    pub async fn rewind(&mut self) -> SessionResult<()> {
        let step = self.settings.seek_step.as_millis() as i64;
        self.seek_by(-step).await
    }

    /// Skips forward by the configured step
    pub async fn fast_forward(&mut self) -> SessionResult<()> {
        let step = self.settings.seek_step.as_millis() as i64;
        self.seek_by(step).await
    }

    /// Changes the speed; it is stored with the next position save
    pub fn set_speed(&mut self, speed: PlaybackSpeed) -> SessionResult<()> {
        let engine_holds_track = self
            .current
            .as_ref()
            .is_some_and(|c| !c.needs_reopen);
        if self.phase.is_ready() && engine_holds_track {
            self.engine.set_speed(speed)?;
        }
        if let Some(pending) = self.pending.as_mut() {
            pending.speed = None;
        }
        self.speed = speed;
        self.publish();
        Ok(())
    }

    /// Loads the next track of the collection
    ///
    /// Returns false at the end of the collection.
    pub async fn skip_to_next(&mut self) -> SessionResult<bool> {
        let (track_id, collection) = self.reference_track()?;
        match self.catalog.next(collection.id, track_id).await? {
            Some(next) => {
                self.begin_load(next, collection, true, None).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Restarts the current track, or loads the previous one near its start
    ///
    /// Returns false when already at the start of the first track.
    pub async fn skip_to_previous(&mut self) -> SessionResult<bool> {
        let restart_at = match (&self.pending, &self.current) {
            (None, Some(current)) => {
                let restart_after = current
                    .policy
                    .lead_in
                    .saturating_add(self.settings.restart_threshold);
                (current.position > restart_after).then_some(current.policy.lead_in)
            }
            _ => None,
        };
        if let Some(lead_in) = restart_at {
            self.seek(lead_in).await?;
            return Ok(true);
        }

        let (track_id, collection) = self.reference_track()?;
        match self.catalog.previous(collection.id, track_id).await? {
            Some(previous) => {
                self.begin_load(previous, collection, true, None).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stops playback and clears the session
    pub async fn stop(&mut self) -> SessionResult<()> {
        if let Some(pending) = self.pending.take() {
            self.outcomes.push(LoadOutcome {
                generation: pending.generation,
                result: Err(SessionError::Superseded {
                    track: pending.track.id,
                }),
            });
        }

        let engine_holds_track = self.current.as_ref().map(|c| !c.needs_reopen);
        if engine_holds_track == Some(true) && self.phase == SessionPhase::Playing {
            if let Err(e) = self.engine.pause() {
                log::warn!("Engine refused to pause on stop: {}", e);
            }
        }
        if engine_holds_track.is_some() {
            self.persist_and_wait().await;
        }

        self.current = None;
        self.generation = self.generation.next();
        self.phase = SessionPhase::Empty;
        log::debug!("Session stopped");
        self.publish();
        Ok(())
    }

    /// Loads the most recently heard track at its saved position
    ///
    /// Returns `None` when there is nothing to continue. Store failures count
    /// as nothing to continue.
    pub async fn resume_last(&mut self, autoplay: bool) -> SessionResult<Option<LoadTicket>> {
        let latest =
            match restore_latest_across_library(self.store.as_ref(), self.catalog.as_ref()).await {
                Ok(latest) => latest,
                Err(e) => {
                    log::warn!("Could not look up last position: {}", e);
                    None
                }
            };
        let Some((track, record)) = latest else {
            return Ok(None);
        };

        let collection = match self.catalog.get_collection(track.collection_id).await {
            Ok(Some(collection)) => collection,
            Ok(None) => return Ok(None),
            Err(e) => {
                log::warn!("Could not look up collection of last track: {}", e);
                return Ok(None);
            }
        };

        let already_loaded = self
            .current
            .as_ref()
            .is_some_and(|c| c.track.id == track.id && !c.needs_reopen);
        if already_loaded && self.phase.is_ready() {
            if autoplay {
                self.resume().await?;
            }
            return Ok(Some(LoadTicket::AlreadyLoaded));
        }

        log::info!("Continuing {} at {}", track.name, record.position);
        let generation = self
            .begin_load(track, collection, autoplay, Some(record.position))
            .await?;
        if let Some(pending) = self.pending.as_mut() {
            pending.speed = Some(record.speed);
        }
        Ok(Some(LoadTicket::Opening(generation)))
    }

    pub fn start_sleep_timer(&mut self, request: SleepTimerRequest) -> SessionResult<()> {
        match request {
            SleepTimerRequest::Duration { minutes } => {
                let minutes = minutes.unwrap_or(self.settings.sleep_default_minutes);
                self.sleep_timer.start_duration(minutes, self.clock.now())?;
            }
            SleepTimerRequest::TrackCount { tracks } => {
                let tracks = tracks.unwrap_or(self.settings.sleep_default_tracks);
                self.sleep_timer.start_track_count(tracks)?;
            }
        }
        self.publish();
        Ok(())
    }

    pub fn extend_sleep_timer(&mut self, minutes: Option<u32>) -> SessionResult<()> {
        let minutes = minutes.unwrap_or(self.settings.sleep_extend_minutes);
        self.sleep_timer.extend(minutes)?;
        self.publish();
        Ok(())
    }

    /// Returns true if a timer was running
    pub fn cancel_sleep_timer(&mut self) -> bool {
        let was_active = self.sleep_timer.cancel();
        self.publish();
        was_active
    }

    /// Waits until queued position saves reached the store
    pub fn flush(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let writer = self.writer.clone();
        async move { writer.flush().await }
    }

    /// Stores the current position and waits for pending saves
    pub async fn shutdown(&mut self) {
        self.persist_and_wait().await;
        self.writer.flush().await;
    }

    // ===== Events =====

    /// Applies one engine event
    ///
    /// Events tagged with anything but the latest generation are dropped.
    pub async fn on_engine_event(&mut self, event: EngineEvent) {
        let generation = event.generation();
        let pending_generation = self.pending.as_ref().map(|p| p.generation);
        let is_current = generation == self.generation && self.phase.is_ready();

        match event {
            EngineEvent::Ready { duration, .. } if pending_generation == Some(generation) => {
                self.on_ready(duration);
            }
            EngineEvent::OpenFailed { error, .. } if pending_generation == Some(generation) => {
                self.on_open_failed(error);
            }
            EngineEvent::Position {
                position,
                processing_state,
                ..
            } if is_current => {
                self.on_position(position, processing_state).await;
            }
            EngineEvent::Completed { .. } if is_current => {
                self.evaluate_completion(CompletionTrigger::EngineCompleted)
                    .await;
            }
            EngineEvent::Error { error, .. } if is_current => {
                self.on_playback_error(error).await;
            }
            other => {
                log::trace!(
                    "Ignoring event {:?} (current generation {})",
                    other,
                    self.generation
                );
            }
        }

        self.publish();
    }

    /// Periodic housekeeping: sleep timer expiry and load timeouts
    pub async fn tick(&mut self) {
        let now = self.clock.now();

        if let Some(expired) = self.sleep_timer.tick(now) {
            self.on_sleep_expired(expired).await;
        }

        let timed_out = self
            .pending
            .as_ref()
            .filter(|p| now.since(p.started_at) >= self.settings.load_timeout)
            .map(|p| p.generation);
        if let Some(generation) = timed_out {
            let error = self.fail_load(EngineError::Timeout(self.settings.load_timeout.into()));
            self.outcomes.push(LoadOutcome {
                generation,
                result: Err(error),
            });
        }

        self.publish();
    }

    // ===== Internals =====

    /// Track whose neighbours skip intents refer to
    fn reference_track(&self) -> SessionResult<(TrackId, Collection)> {
        match (&self.pending, &self.current) {
            (Some(pending), _) => Ok((pending.track.id, pending.collection.clone())),
            (None, Some(current)) => Ok((current.track.id, current.collection.clone())),
            (None, None) => Err(SessionError::NoTrackLoaded),
        }
    }

    async fn begin_load(
        &mut self,
        track: Track,
        collection: Collection,
        autoplay: bool,
        restore_override: Option<Duration>,
    ) -> SessionResult<Generation> {
        let previous = match self.pending.take() {
            Some(superseded) => {
                log::debug!(
                    "Load of {} superseded by {}",
                    superseded.track.name,
                    track.name
                );
                self.outcomes.push(LoadOutcome {
                    generation: superseded.generation,
                    result: Err(SessionError::Superseded {
                        track: superseded.track.id,
                    }),
                });
                superseded.previous
            }
            None => {
                self.persist_and_wait().await;
                self.current.take()
            }
        };

        self.generation = self.generation.next();
        let generation = self.generation;
        let policy = SkipPolicy::resolve(&collection, &track);

        let restore = match restore_override {
            Some(position) => Some(position),
            None => {
                let store = self.store.clone();
                restore_position(store.as_ref(), track.id).await
            }
        };

        log::info!("Loading {} ({})", track.name, generation);
        self.pending = Some(PendingLoad {
            generation,
            track,
            collection,
            policy,
            restore,
            started_at: self.clock.now(),
            retries_left: self.settings.transient_retries,
            autoplay,
            speed: None,
            previous,
        });
        self.phase = SessionPhase::Loading;
        self.publish();

        self.open_pending()?;
        Ok(generation)
    }

    /// Asks the engine to open the pending track, retrying transient rejections
    fn open_pending(&mut self) -> SessionResult<()> {
        loop {
            let Some(pending) = self.pending.as_mut() else {
                return Ok(());
            };

            match self.engine.open(&pending.track.file_path, pending.generation) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && pending.retries_left > 0 => {
                    pending.retries_left -= 1;
                    log::warn!("Retrying open of {}: {}", pending.track.name, e);
                }
                Err(e) => return Err(self.fail_load(e)),
            }
        }
    }

    fn on_ready(&mut self, reported: Duration) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let total = if reported.is_zero() {
            self.engine.duration().unwrap_or(pending.track.duration)
        } else {
            reported
        };

        // The engine's length wins over the catalog's
        let policy = if total == pending.track.duration {
            pending.policy
        } else {
            SkipPolicy::for_length(&pending.collection, total)
        };

        // A saved position at the end belongs to a finished listen
        let finished = |position: Duration| {
            !total.is_zero() && (position >= total || policy.in_lead_out(position, total))
        };
        let position = match pending.restore {
            Some(position) if finished(position) => policy.lead_in,
            Some(position) => position.max(policy.lead_in),
            None => policy.lead_in,
        };

        let speed = pending.speed.unwrap_or(self.speed);
        if let Err(e) = start_playback(&mut self.engine, speed, position, pending.autoplay) {
            let generation = pending.generation;
            self.pending = Some(pending);
            let error = self.fail_load(e);
            self.outcomes.push(LoadOutcome {
                generation,
                result: Err(error),
            });
            return;
        }

        let now = self.clock.now();
        let loaded = LoadedTrack {
            track: pending.track,
            collection: pending.collection,
            policy,
            position,
            total,
            completion: TrackCompletion::Listening,
            seek_window: (!position.is_zero()).then(|| SeekWindow {
                target: position,
                until: now.plus(self.settings.seek_settle),
            }),
            last_saved_at: Some(now),
            needs_reopen: false,
        };

        log::info!(
            "Ready: {} at {} of {}",
            loaded.track.name,
            position,
            total
        );
        self.phase = if pending.autoplay {
            SessionPhase::Playing
        } else {
            SessionPhase::Paused
        };
        self.current = Some(loaded);
        self.speed = speed;
        self.last_error = None;

        // The new track becomes the one to continue from
        self.persist();

        self.outcomes.push(LoadOutcome {
            generation: pending.generation,
            result: Ok(()),
        });
    }

    fn on_open_failed(&mut self, error: EngineError) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let generation = pending.generation;

        let result = if error.is_transient() && pending.retries_left > 0 {
            pending.retries_left -= 1;
            log::warn!("Retrying open of {}: {}", pending.track.name, error);
            self.open_pending()
        } else {
            Err(self.fail_load(error))
        };

        if let Err(error) = result {
            self.outcomes.push(LoadOutcome {
                generation,
                result: Err(error),
            });
        }
    }

    /// Abandons the pending load and falls back to the previous track
    fn fail_load(&mut self, error: EngineError) -> SessionError {
        let Some(pending) = self.pending.take() else {
            return SessionError::Engine(error);
        };

        // Late events of the failed open must not touch the session
        self.generation = self.generation.next();

        log::error!("Failed to load {}: {}", pending.track.name, error);
        let failure = SessionError::LoadFailed {
            track: pending.track.id,
            source: error,
        };
        self.last_error = Some(failure.user_message());

        match pending.previous {
            Some(mut previous) => {
                previous.needs_reopen = true;
                previous.seek_window = None;
                self.current = Some(previous);
                self.phase = SessionPhase::Paused;
            }
            None => {
                self.current = None;
                self.phase = SessionPhase::Empty;
            }
        }
        self.publish();
        failure
    }

    async fn on_position(&mut self, position: Duration, processing_state: ProcessingState) {
        let now = self.clock.now();
        let tolerance = self.settings.seek_tolerance;
        let Some(current) = self.current.as_mut() else {
            return;
        };

        if let Some(window) = current.seek_window {
            if now < window.until && position.abs_diff(window.target) > tolerance {
                log::trace!(
                    "Ignoring position {} reported while seeking to {}",
                    position,
                    window.target
                );
                return;
            }
            current.seek_window = None;
        }

        current.position = if current.total.is_zero() {
            position
        } else {
            position.min(current.total)
        };

        if processing_state == ProcessingState::Completed {
            self.evaluate_completion(CompletionTrigger::EngineCompleted)
                .await;
            return;
        }

        if self.phase == SessionPhase::Playing {
            let due = current
                .last_saved_at
                .is_none_or(|saved| now.since(saved) >= self.settings.save_interval);
            if due {
                self.persist();
            }
            self.evaluate_completion(CompletionTrigger::LeadOut).await;
        }
    }

    /// The single place a track is declared finished
    ///
    /// Runs at most once per loaded track, whichever source reports the end
    /// first.
    async fn evaluate_completion(&mut self, trigger: CompletionTrigger) {
        let playing = self.phase == SessionPhase::Playing;
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if current.completion != TrackCompletion::Listening {
            return;
        }
        if trigger == CompletionTrigger::LeadOut
            && !(playing && current.policy.in_lead_out(current.position, current.total))
        {
            return;
        }

        current.completion = TrackCompletion::Completed(trigger);
        if trigger == CompletionTrigger::EngineCompleted && !current.total.is_zero() {
            current.position = current.total;
        }
        log::debug!("{} finished ({:?})", current.track.name, trigger);

        if trigger == CompletionTrigger::LeadOut {
            if let Err(e) = self.engine.pause() {
                log::warn!("Engine refused to pause at lead-out: {}", e);
            }
        }
        self.phase = SessionPhase::Paused;
        self.persist();

        let now = self.clock.now();
        let expired = self
            .sleep_timer
            .on_track_completed()
            .or_else(|| self.sleep_timer.tick(now));
        if let Some(expired) = expired {
            self.on_sleep_expired(expired).await;
        }
        if self.sleep_timer.is_expired() {
            return;
        }

        if let Err(e) = self.advance().await {
            log::warn!("Could not continue to the next track: {}", e);
        }
    }

    /// Loads the next track; at the end of the collection stays paused
    async fn advance(&mut self) -> SessionResult<bool> {
        let Some(current) = self.current.as_ref() else {
            return Ok(false);
        };
        let (collection_id, track_id) = (current.collection.id, current.track.id);

        let Some(next) = self.catalog.next(collection_id, track_id).await? else {
            log::info!("Reached the end of {}", current.collection.title);
            return Ok(false);
        };

        // Skip settings may have changed since the collection was loaded
        let collection = match self.catalog.get_collection(collection_id).await {
            Ok(Some(collection)) => collection,
            _ => current.collection.clone(),
        };

        log::info!("Advancing to {}", next.name);
        self.begin_load(next, collection, true, None).await?;
        Ok(true)
    }

    /// Resume after the track ended: move on, or replay the last track
    async fn continue_after_completion(&mut self) -> SessionResult<()> {
        if self.advance().await? {
            return Ok(());
        }

        let Some(current) = self.current.as_mut() else {
            return Err(SessionError::NoTrackLoaded);
        };
        let lead_in = current.policy.lead_in;
        self.engine.seek(lead_in)?;
        self.engine.play()?;
        current.position = lead_in;
        current.completion = TrackCompletion::Listening;
        current.seek_window = None;
        self.phase = SessionPhase::Playing;
        self.publish();
        Ok(())
    }

    async fn on_playback_error(&mut self, error: EngineError) {
        log::error!("Playback error: {}", error);
        self.last_error = Some(SessionError::Engine(error).user_message());
        if self.phase == SessionPhase::Playing {
            self.phase = SessionPhase::Paused;
        }
        self.persist_and_wait().await;
    }

    async fn on_sleep_expired(&mut self, expired: Expired) {
        log::info!(
            "Sleep timer ran out ({})",
            if expired.by_track_count {
                "track count"
            } else {
                "duration"
            }
        );
        if self.phase == SessionPhase::Playing {
            if let Err(e) = self.engine.pause() {
                log::warn!("Engine refused to pause for sleep timer: {}", e);
            }
            self.phase = SessionPhase::Paused;
            self.persist_and_wait().await;
        }
    }

    fn current_record(&self) -> Option<PositionRecord> {
        let current = self.current.as_ref()?;
        Some(PositionRecord::at(
            current.track.id,
            current.position,
            current.total,
            self.speed,
            self.clock.now(),
        ))
    }

    /// Queues a save of the current position
    fn persist(&mut self) {
        if let Some(record) = self.current_record() {
            let saved_at = record.saved_at;
            self.writer.save(record);
            if let Some(current) = self.current.as_mut() {
                current.last_saved_at = Some(saved_at);
            }
        }
    }

    /// Saves the current position and waits for the store
    async fn persist_and_wait(&mut self) {
        if let Some(record) = self.current_record() {
            let saved_at = record.saved_at;
            self.writer.save_and_wait(record).await;
            if let Some(current) = self.current.as_mut() {
                current.last_saved_at = Some(saved_at);
            }
        }
    }
}

/// Saved position of `track`; store failures read as nothing saved
async fn restore_position(store: &dyn PositionStore, track: TrackId) -> Option<Duration> {
    match store.restore(track).await {
        Ok(record) => record.map(|r| r.position),
        Err(e) => {
            log::warn!("Could not restore position of track {}: {}", track, e);
            None
        }
    }
}

fn start_playback<E: AudioEngine>(
    engine: &mut E,
    speed: PlaybackSpeed,
    position: Duration,
    autoplay: bool,
) -> EngineResult<()> {
    engine.set_speed(speed)?;
    if !position.is_zero() {
        engine.seek(position)?;
    }
    if autoplay {
        engine.play()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryLibrary;
    use std::path::Path;

    /// Accepts every command and remembers the last seek
    #[derive(Default)]
    struct AcceptingEngine {
        last_seek: Option<Duration>,
        playing: bool,
    }

    impl AudioEngine for AcceptingEngine {
        fn open(&mut self, _path: &Path, _generation: Generation) -> EngineResult<()> {
            self.playing = false;
            Ok(())
        }

        fn play(&mut self) -> EngineResult<()> {
            self.playing = true;
            Ok(())
        }

        fn pause(&mut self) -> EngineResult<()> {
            self.playing = false;
            Ok(())
        }

        fn seek(&mut self, position: Duration) -> EngineResult<()> {
            self.last_seek = Some(position);
            Ok(())
        }

        fn set_speed(&mut self, _speed: PlaybackSpeed) -> EngineResult<()> {
            Ok(())
        }

        fn duration(&self) -> Option<Duration> {
            None
        }
    }

    fn controller() -> (
        SessionController<AcceptingEngine>,
        Arc<MemoryLibrary>,
        ManualClock,
    ) {
        let library = Arc::new(MemoryLibrary::new());
        let clock = ManualClock::new(Timestamp::from_millis(1_000_000));
        let controller = SessionController::new(
            AcceptingEngine::default(),
            library.clone(),
            library.clone(),
            Arc::new(clock.clone()),
            SessionSettings::default(),
        );
        (controller, library, clock)
    }

    async fn loaded(
        controller: &mut SessionController<AcceptingEngine>,
        track: &Track,
        collection: &Collection,
    ) -> Generation {
        let ticket = controller
            .load(track.clone(), collection.clone())
            .await
            .unwrap();
        let LoadTicket::Opening(generation) = ticket else {
            panic!("expected a fresh load");
        };
        controller
            .on_engine_event(EngineEvent::Ready {
                generation,
                duration: track.duration,
            })
            .await;
        generation
    }

    #[tokio::test]
    async fn test_events_from_older_generation_are_ignored() {
        let (mut controller, library, _) = controller();
        let (collection, tracks) = library.add_collection("Book", 0, 0, &[60_000, 60_000]);

        let first = controller
            .load(tracks[0].clone(), collection.clone())
            .await
            .unwrap();
        let second = loaded(&mut controller, &tracks[1], &collection).await;
        assert_ne!(first, LoadTicket::Opening(second));

        let LoadTicket::Opening(first) = first else {
            panic!("expected a fresh load");
        };
        controller
            .on_engine_event(EngineEvent::Ready {
                generation: first,
                duration: Duration::from_seconds(60),
            })
            .await;
        controller
            .on_engine_event(EngineEvent::Position {
                generation: first,
                position: Duration::from_seconds(42),
                is_playing: true,
                processing_state: ProcessingState::Ready,
            })
            .await;

        assert_eq!(controller.current_track().map(|t| t.id), Some(tracks[1].id));
        assert_eq!(controller.position(), Duration::ZERO);
        assert_eq!(controller.phase(), SessionPhase::Playing);
    }

    #[tokio::test]
    async fn test_seek_clamps_and_ignores_stale_reports() {
        let (mut controller, library, clock) = controller();
        let (collection, tracks) = library.add_collection("Book", 0, 0, &[60_000]);
        let generation = loaded(&mut controller, &tracks[0], &collection).await;

        controller.seek(Duration::from_seconds(600)).await.unwrap();
        assert_eq!(controller.position(), Duration::from_seconds(60));
        assert_eq!(controller.engine().last_seek, Some(Duration::from_seconds(60)));

        controller.seek(Duration::from_seconds(30)).await.unwrap();
        let report = |secs| EngineEvent::Position {
            generation,
            position: Duration::from_seconds(secs),
            is_playing: true,
            processing_state: ProcessingState::Ready,
        };

        // A report from before the seek landed
        controller.on_engine_event(report(5)).await;
        assert_eq!(controller.position(), Duration::from_seconds(30));

        clock.advance(Duration::from_millis(100));
        controller.on_engine_event(report(31)).await;
        assert_eq!(controller.position(), Duration::from_seconds(31));

        // The window closed with the first matching report
        controller.on_engine_event(report(5)).await;
        assert_eq!(controller.position(), Duration::from_seconds(5));
    }

    #[tokio::test]
    async fn test_intents_without_track() {
        let (mut controller, _, _) = controller();
        assert!(matches!(
            controller.resume().await,
            Err(SessionError::NoTrackLoaded)
        ));
        assert!(matches!(
            controller.pause().await,
            Err(SessionError::NoTrackLoaded)
        ));
        assert!(matches!(
            controller.seek(Duration::from_seconds(1)).await,
            Err(SessionError::NoTrackLoaded)
        ));
        assert!(controller.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_follows_load() {
        let (mut controller, library, _) = controller();
        let (collection, tracks) = library.add_collection("Book", 4, 0, &[60_000]);
        let mut snapshots = controller.subscribe();

        controller
            .load(tracks[0].clone(), collection.clone())
            .await
            .unwrap();
        assert_eq!(snapshots.borrow_and_update().phase, SessionPhase::Loading);

        controller
            .on_engine_event(EngineEvent::Ready {
                generation: controller.generation(),
                duration: Duration::ZERO,
            })
            .await;
        let snapshot = snapshots.borrow_and_update().clone();
        assert!(snapshot.is_playing());
        assert_eq!(snapshot.position, Duration::from_seconds(4));
        assert_eq!(snapshot.total_duration, Duration::from_seconds(60));
        assert_eq!(snapshot.collection_id, Some(collection.id));
    }

    #[tokio::test]
    async fn test_load_outcomes_are_drained_once() {
        let (mut controller, library, _) = controller();
        let (collection, tracks) = library.add_collection("Book", 0, 0, &[60_000]);
        let generation = loaded(&mut controller, &tracks[0], &collection).await;

        let outcomes = controller.take_load_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].generation, generation);
        assert!(outcomes[0].result.is_ok());
        assert!(controller.take_load_outcomes().is_empty());
    }
}
