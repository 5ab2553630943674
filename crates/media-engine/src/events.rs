//! Events flowing from an engine back to the session

use crate::error::EngineError;
use talebox_core::Duration;
use tokio::sync::mpsc;

/// Identifies one `open` request
///
/// Every event an engine emits carries the generation of the open it belongs
/// to, so results of an abandoned open can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub const INITIAL: Generation = Generation(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Engine pipeline state as reported alongside positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Loading,
    Buffering,
    Ready,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The source opened and its duration is known (zero if the container has none)
    Ready {
        generation: Generation,
        duration: Duration,
    },

    /// The source could not be opened
    OpenFailed {
        generation: Generation,
        error: EngineError,
    },

    /// Periodic progress report
    Position {
        generation: Generation,
        position: Duration,
        is_playing: bool,
        processing_state: ProcessingState,
    },

    /// Playback reached the natural end of the source
    Completed { generation: Generation },

    /// Playback failed after the source was opened
    Error {
        generation: Generation,
        error: EngineError,
    },
}

impl EngineEvent {
    pub fn generation(&self) -> Generation {
        match self {
            Self::Ready { generation, .. }
            | Self::OpenFailed { generation, .. }
            | Self::Position { generation, .. }
            | Self::Completed { generation }
            | Self::Error { generation, .. } => *generation,
        }
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Sending half used by engine implementations
///
/// Sends never block. Once the session has gone away events are dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSender {
    pub fn channel() -> (EventSender, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSender { tx }, rx)
    }

    /// Returns false if nobody is listening any more
    pub fn send(&self, event: EngineEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                log::trace!("Dropping engine event {:?}: session closed", event);
                false
            }
        }
    }

    pub fn ready(&self, generation: Generation, duration: Duration) -> bool {
        self.send(EngineEvent::Ready {
            generation,
            duration,
        })
    }

    pub fn open_failed(&self, generation: Generation, error: EngineError) -> bool {
        self.send(EngineEvent::OpenFailed { generation, error })
    }

    pub fn position(
        &self,
        generation: Generation,
        position: Duration,
        is_playing: bool,
        processing_state: ProcessingState,
    ) -> bool {
        self.send(EngineEvent::Position {
            generation,
            position,
            is_playing,
            processing_state,
        })
    }

    pub fn completed(&self, generation: Generation) -> bool {
        self.send(EngineEvent::Completed { generation })
    }

    pub fn error(&self, generation: Generation, error: EngineError) -> bool {
        self.send(EngineEvent::Error { generation, error })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
