//! Talebox playback session
//!
//! Coordinates one listening session on top of an [`AudioEngine`]: loading
//! tracks, restoring and saving positions, honouring each collection's skip
//! settings, advancing through a collection exactly once per finished track,
//! and the sleep timer.
//!
//! ```no_run
//! # async fn demo<E: media_engine::AudioEngine + 'static>(
//! #     engine: E,
//! #     events: media_engine::EventReceiver,
//! #     pool: talebox_database::DbPool,
//! # ) -> talebox_session::SessionResult<()> {
//! use std::sync::Arc;
//! use talebox_session::*;
//!
//! let controller = SessionController::new(
//!     engine,
//!     Arc::new(SqliteCatalog::new(pool.clone())),
//!     Arc::new(SqlitePositionStore::new(pool)),
//!     Arc::new(SystemClock),
//!     SessionSettings::default(),
//! );
//! let (session, _task) = SessionDriver::spawn(controller, events);
//! session.resume_last(false).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`AudioEngine`]: media_engine::AudioEngine

mod catalog;
mod clock;
mod controller;
mod driver;
mod error;
mod memory;
mod persistence;
mod settings;
mod skip_policy;
mod sleep_timer;
mod snapshot;

pub use catalog::{SqliteCatalog, TrackCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{
    CompletionTrigger, LoadOutcome, LoadTicket, SessionController, SleepTimerRequest,
    TrackCompletion,
};
pub use driver::{SessionDriver, SessionHandle};
pub use error::{SessionError, SessionResult};
pub use memory::MemoryLibrary;
pub use persistence::{
    restore_latest_across_library, PositionStore, PositionWriter, SqlitePositionStore,
};
pub use settings::SessionSettings;
pub use skip_policy::SkipPolicy;
pub use sleep_timer::{
    Expired, Remaining, SleepTimer, SleepTimerMode, SleepTimerState, SleepTimerStatus,
};
pub use snapshot::{SessionPhase, SessionSnapshot};
