//! Shared fixtures: a scripted engine and a controller harness
#![allow(dead_code)]

use media_engine::{
    AudioEngine, EngineError, EngineEvent, EngineResult, EventReceiver, EventSender, Generation,
    ProcessingState,
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use talebox_core::{Collection, Duration, PlaybackSpeed, PositionRecord, Timestamp, Track};
use talebox_session::{
    ManualClock, MemoryLibrary, PositionStore, SessionController, SessionSettings,
};

pub const START: i64 = 1_700_000_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Open(PathBuf, Generation),
    Play,
    Pause,
    Seek(Duration),
    SetSpeed(PlaybackSpeed),
}

#[derive(Debug)]
struct Script {
    auto_ready: bool,
    durations: HashMap<PathBuf, Duration>,
    rejections: VecDeque<EngineError>,
    open_failures: HashMap<PathBuf, VecDeque<EngineError>>,
    commands: Vec<EngineCommand>,
}

/// Engine double that answers opens from a script and records every command
pub struct ScriptedEngine {
    events: EventSender,
    script: Arc<Mutex<Script>>,
    duration: Option<Duration>,
}

/// Test-side view of a [`ScriptedEngine`]
#[derive(Clone)]
pub struct EngineProbe {
    events: EventSender,
    script: Arc<Mutex<Script>>,
}

impl ScriptedEngine {
    pub fn new() -> (Self, EngineProbe, EventReceiver) {
        let (events, rx) = EventSender::channel();
        let script = Arc::new(Mutex::new(Script {
            auto_ready: true,
            durations: HashMap::new(),
            rejections: VecDeque::new(),
            open_failures: HashMap::new(),
            commands: Vec::new(),
        }));
        let engine = Self {
            events: events.clone(),
            script: script.clone(),
            duration: None,
        };
        (engine, EngineProbe { events, script }, rx)
    }

    fn record(&self, command: EngineCommand) {
        self.script.lock().unwrap().commands.push(command);
    }
}

impl AudioEngine for ScriptedEngine {
    fn open(&mut self, path: &Path, generation: Generation) -> EngineResult<()> {
        let mut script = self.script.lock().unwrap();
        if let Some(error) = script.rejections.pop_front() {
            return Err(error);
        }
        script
            .commands
            .push(EngineCommand::Open(path.to_path_buf(), generation));

        let failure = script
            .open_failures
            .get_mut(path)
            .and_then(|failures| failures.pop_front());
        if let Some(error) = failure {
            self.events.open_failed(generation, error);
        } else if script.auto_ready {
            let duration = script.durations.get(path).copied().unwrap_or(Duration::ZERO);
            self.duration = Some(duration);
            self.events.ready(generation, duration);
        }
        Ok(())
    }

    fn play(&mut self) -> EngineResult<()> {
        self.record(EngineCommand::Play);
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.record(EngineCommand::Pause);
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> EngineResult<()> {
        self.record(EngineCommand::Seek(position));
        Ok(())
    }

    fn set_speed(&mut self, speed: PlaybackSpeed) -> EngineResult<()> {
        self.record(EngineCommand::SetSpeed(speed));
        Ok(())
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

impl EngineProbe {
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.script.lock().unwrap().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.script.lock().unwrap().commands.clear();
    }

    /// Paths opened so far, in order
    pub fn opened(&self) -> Vec<PathBuf> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                EngineCommand::Open(path, _) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn last_generation(&self) -> Option<Generation> {
        self.commands().into_iter().rev().find_map(|c| match c {
            EngineCommand::Open(_, generation) => Some(generation),
            _ => None,
        })
    }

    /// When off, opens stay pending until [`EngineProbe::ready`] is called
    pub fn set_auto_ready(&self, auto_ready: bool) {
        self.script.lock().unwrap().auto_ready = auto_ready;
    }

    /// Duration the engine reports for every track of the collection
    pub fn report_durations(&self, tracks: &[Track]) {
        let mut script = self.script.lock().unwrap();
        for track in tracks {
            script.durations.insert(track.file_path.clone(), track.duration);
        }
    }

    /// Overrides the length the engine reports for one file
    pub fn report_duration(&self, path: &Path, duration: Duration) {
        self.script
            .lock()
            .unwrap()
            .durations
            .insert(path.to_path_buf(), duration);
    }

    pub fn reject_next_open(&self, error: EngineError) {
        self.script.lock().unwrap().rejections.push_back(error);
    }

    pub fn fail_open(&self, path: &Path, error: EngineError) {
        self.script
            .lock()
            .unwrap()
            .open_failures
            .entry(path.to_path_buf())
            .or_default()
            .push_back(error);
    }

    pub fn ready(&self, generation: Generation, duration: Duration) {
        self.events.ready(generation, duration);
    }

    pub fn position(&self, generation: Generation, position_ms: u64) {
        self.events.position(
            generation,
            Duration::from_millis(position_ms),
            true,
            ProcessingState::Ready,
        );
    }

    pub fn completed(&self, generation: Generation) {
        self.events.completed(generation);
    }

    pub fn send(&self, event: EngineEvent) {
        self.events.send(event);
    }
}

pub struct Harness {
    pub controller: SessionController<ScriptedEngine>,
    pub events: EventReceiver,
    pub probe: EngineProbe,
    pub library: Arc<MemoryLibrary>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(SessionSettings::default())
    }

    pub fn with_settings(settings: SessionSettings) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let (engine, probe, events) = ScriptedEngine::new();
        let library = Arc::new(MemoryLibrary::new());
        let clock = ManualClock::new(Timestamp::from_millis(START));
        let controller = SessionController::new(
            engine,
            library.clone(),
            library.clone(),
            Arc::new(clock.clone()),
            settings,
        );

        Self {
            controller,
            events,
            probe,
            library,
            clock,
        }
    }

    /// Adds a collection whose tracks the engine opens with their catalog duration
    pub fn add_collection(
        &self,
        title: &str,
        skip_start_secs: u32,
        skip_end_secs: u32,
        durations_ms: &[u64],
    ) -> (Collection, Vec<Track>) {
        let (collection, tracks) =
            self.library
                .add_collection(title, skip_start_secs, skip_end_secs, durations_ms);
        self.probe.report_durations(&tracks);
        (collection, tracks)
    }

    /// Feeds every queued engine event to the controller
    pub async fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.controller.on_engine_event(event).await;
        }
    }

    pub async fn play(&mut self, track: &Track, collection: &Collection) {
        self.controller
            .load(track.clone(), collection.clone())
            .await
            .unwrap();
        self.pump().await;
    }

    /// Reports a playing position for the latest open and applies it
    pub async fn report(&mut self, position_ms: u64) {
        let generation = self.probe.last_generation().unwrap();
        self.probe.position(generation, position_ms);
        self.pump().await;
    }

    pub async fn complete(&mut self) {
        let generation = self.probe.last_generation().unwrap();
        self.probe.completed(generation);
        self.pump().await;
    }

    pub fn current_name(&self) -> Option<String> {
        self.controller.current_track().map(|t| t.name.clone())
    }

    pub async fn saved(&self, track: &Track) -> Option<PositionRecord> {
        self.controller.flush().await;
        self.library.restore(track.id).await.unwrap()
    }
}
