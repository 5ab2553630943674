//! Task that owns a [`SessionController`] and serializes access to it
//!
//! User intents arrive over a command channel, engine events over the
//! engine's event channel, and a one-second tick drives the sleep timer and
//! load timeouts. Everything is applied in arrival order on a single task.

use crate::controller::{LoadTicket, SessionController, SleepTimerRequest};
use crate::error::{SessionError, SessionResult};
use crate::snapshot::SessionSnapshot;
use media_engine::{AudioEngine, EventReceiver, Generation};
use std::collections::HashMap;
use talebox_core::{Collection, Duration, PlaybackSpeed, Track};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const COMMAND_QUEUE: usize = 64;
const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

type Reply<T> = oneshot::Sender<SessionResult<T>>;

#[derive(Debug)]
enum SessionCommand {
    /// Replies once the track is ready or the load is abandoned
    Load {
        track: Track,
        collection: Collection,
        reply: Reply<()>,
    },
    Resume(Reply<()>),
    Pause(Reply<()>),
    Seek(Duration, Reply<()>),
    SeekBy(i64, Reply<()>),
    SetSpeed(PlaybackSpeed, Reply<()>),
    SkipToNext(Reply<bool>),
    SkipToPrevious(Reply<bool>),
    Stop(Reply<()>),
    ResumeLast {
        autoplay: bool,
        reply: Reply<bool>,
    },
    StartSleepTimer(SleepTimerRequest, Reply<()>),
    ExtendSleepTimer(Option<u32>, Reply<()>),
    CancelSleepTimer(oneshot::Sender<bool>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front end of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

pub struct SessionDriver<E: AudioEngine> {
    controller: SessionController<E>,
    events: EventReceiver,
    commands: mpsc::Receiver<SessionCommand>,
    /// Load requests waiting for their generation to settle
    waiting: HashMap<Generation, Vec<Reply<()>>>,
}

impl<E: AudioEngine + 'static> SessionDriver<E> {
    /// Starts the session task on the current runtime
    pub fn spawn(
        controller: SessionController<E>,
        events: EventReceiver,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let handle = SessionHandle {
            commands: tx,
            snapshots: controller.subscribe(),
        };

        let driver = Self {
            controller,
            events,
            commands: rx,
            waiting: HashMap::new(),
        };
        let task = tokio::spawn(driver.run());
        (handle, task)
    }

    async fn run(mut self) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        log::debug!("Session driver started");
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown(done)) => {
                            self.controller.shutdown().await;
                            let _ = done.send(());
                            break;
                        }
                        Some(command) => self.handle(command).await,
                        None => {
                            self.controller.shutdown().await;
                            break;
                        }
                    }
                }
                event = self.events.recv(), if events_open => {
                    match event {
                        Some(event) => self.controller.on_engine_event(event).await,
                        None => {
                            log::warn!("Engine event channel closed");
                            events_open = false;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.controller.tick().await;
                }
            }
            self.settle_loads();
        }

        for reply in self.waiting.drain().flat_map(|(_, replies)| replies) {
            let _ = reply.send(Err(SessionError::DriverClosed));
        }
        log::debug!("Session driver stopped");
    }

    async fn handle(&mut self, command: SessionCommand) {
        let controller = &mut self.controller;
        match command {
            SessionCommand::Load {
                track,
                collection,
                reply,
            } => match controller.load(track, collection).await {
                Ok(LoadTicket::Opening(generation)) => {
                    self.waiting.entry(generation).or_default().push(reply);
                }
                Ok(LoadTicket::AlreadyLoaded) => {
                    let _ = reply.send(Ok(()));
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            SessionCommand::Resume(reply) => {
                let _ = reply.send(controller.resume().await);
            }
            SessionCommand::Pause(reply) => {
                let _ = reply.send(controller.pause().await);
            }
            SessionCommand::Seek(position, reply) => {
                let _ = reply.send(controller.seek(position).await);
            }
            SessionCommand::SeekBy(delta_ms, reply) => {
                let _ = reply.send(controller.seek_by(delta_ms).await);
            }
            SessionCommand::SetSpeed(speed, reply) => {
                let _ = reply.send(controller.set_speed(speed));
            }
            SessionCommand::SkipToNext(reply) => {
                let _ = reply.send(controller.skip_to_next().await);
            }
            SessionCommand::SkipToPrevious(reply) => {
                let _ = reply.send(controller.skip_to_previous().await);
            }
            SessionCommand::Stop(reply) => {
                let _ = reply.send(controller.stop().await);
            }
            SessionCommand::ResumeLast { autoplay, reply } => {
                let _ = reply.send(controller.resume_last(autoplay).await.map(|t| t.is_some()));
            }
            SessionCommand::StartSleepTimer(request, reply) => {
                let _ = reply.send(controller.start_sleep_timer(request));
            }
            SessionCommand::ExtendSleepTimer(minutes, reply) => {
                let _ = reply.send(controller.extend_sleep_timer(minutes));
            }
            SessionCommand::CancelSleepTimer(reply) => {
                let _ = reply.send(controller.cancel_sleep_timer());
            }
            SessionCommand::Shutdown(done) => {
                let _ = done.send(());
            }
        }
    }

    fn settle_loads(&mut self) {
        for outcome in self.controller.take_load_outcomes() {
            let Some(replies) = self.waiting.remove(&outcome.generation) else {
                continue;
            };
            for reply in replies {
                let _ = reply.send(clone_result(&outcome.result));
            }
        }
    }
}

/// Load results go to every caller waiting on the same generation
fn clone_result(result: &SessionResult<()>) -> SessionResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(SessionError::LoadFailed { track, source }) => Err(SessionError::LoadFailed {
            track: *track,
            source: source.clone(),
        }),
        Err(SessionError::Superseded { track }) => Err(SessionError::Superseded { track: *track }),
        Err(other) => Err(SessionError::invalid(other.to_string())),
    }
}

impl SessionHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> SessionResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::DriverClosed)?;
        response.await.map_err(|_| SessionError::DriverClosed)?
    }

    /// Loads a track and waits until it is playing
    ///
    /// Fails with [`SessionError::Superseded`] if another load or a stop
    /// comes first.
    pub async fn load(&self, track: Track, collection: Collection) -> SessionResult<()> {
        self.request(|reply| SessionCommand::Load {
            track,
            collection,
            reply,
        })
        .await
    }

    pub async fn resume(&self) -> SessionResult<()> {
        self.request(SessionCommand::Resume).await
    }

    pub async fn pause(&self) -> SessionResult<()> {
        self.request(SessionCommand::Pause).await
    }

    pub async fn seek(&self, position: Duration) -> SessionResult<()> {
        self.request(|reply| SessionCommand::Seek(position, reply))
            .await
    }

    pub async fn seek_by(&self, delta_ms: i64) -> SessionResult<()> {
        self.request(|reply| SessionCommand::SeekBy(delta_ms, reply))
            .await
    }

    pub async fn set_speed(&self, speed: PlaybackSpeed) -> SessionResult<()> {
        self.request(|reply| SessionCommand::SetSpeed(speed, reply))
            .await
    }

    pub async fn skip_to_next(&self) -> SessionResult<bool> {
        self.request(SessionCommand::SkipToNext).await
    }

    pub async fn skip_to_previous(&self) -> SessionResult<bool> {
        self.request(SessionCommand::SkipToPrevious).await
    }

    pub async fn stop(&self) -> SessionResult<()> {
        self.request(SessionCommand::Stop).await
    }

    /// Starts loading the last heard track; false if there is none
    pub async fn resume_last(&self, autoplay: bool) -> SessionResult<bool> {
        self.request(|reply| SessionCommand::ResumeLast { autoplay, reply })
            .await
    }

    pub async fn start_sleep_timer(&self, request: SleepTimerRequest) -> SessionResult<()> {
        self.request(|reply| SessionCommand::StartSleepTimer(request, reply))
            .await
    }

    pub async fn extend_sleep_timer(&self, minutes: Option<u32>) -> SessionResult<()> {
        self.request(|reply| SessionCommand::ExtendSleepTimer(minutes, reply))
            .await
    }

    /// Returns true if a timer was running
    pub async fn cancel_sleep_timer(&self) -> SessionResult<bool> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(SessionCommand::CancelSleepTimer(reply))
            .await
            .map_err(|_| SessionError::DriverClosed)?;
        response.await.map_err(|_| SessionError::DriverClosed)
    }

    /// Saves the position and stops the session task
    pub async fn shutdown(&self) -> SessionResult<()> {
        let (done, response) = oneshot::channel();
        self.commands
            .send(SessionCommand::Shutdown(done))
            .await
            .map_err(|_| SessionError::DriverClosed)?;
        response.await.map_err(|_| SessionError::DriverClosed)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }
}
