//! Saved listening positions
//!
//! Saves are best-effort: the controller hands them to a [`PositionWriter`]
//! task and never waits on the store except where a record must be on disk
//! before it continues (pause, track changes).

use crate::catalog::TrackCatalog;
use async_trait::async_trait;
use std::sync::Arc;
use talebox_core::{PositionRecord, Result, Track, TrackId};
use talebox_database::{queries, DbPool};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// One saved position per track, last write wins
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn save(&self, record: &PositionRecord) -> Result<()>;

    async fn restore(&self, track: TrackId) -> Result<Option<PositionRecord>>;

    /// Most recently saved record across all tracks
    async fn latest(&self) -> Result<Option<PositionRecord>>;

    async fn delete(&self, track: TrackId) -> Result<()>;
}

/// Finds the most recent listening position for "continue listening"
///
/// A record whose track or file has disappeared is deleted and nothing is
/// returned, so the next start does not trip over it again.
pub async fn restore_latest_across_library(
    store: &dyn PositionStore,
    catalog: &dyn TrackCatalog,
) -> Result<Option<(Track, PositionRecord)>> {
    let Some(record) = store.latest().await? else {
        return Ok(None);
    };

    let track = catalog.get_track(record.track_id).await?;
    let usable = match &track {
        Some(track) => tokio::fs::try_exists(&track.file_path)
            .await
            .unwrap_or(false),
        None => false,
    };

    match track {
        Some(track) if usable => Ok(Some((track, record))),
        _ => {
            log::info!(
                "Dropping saved position for track {}: file no longer available",
                record.track_id
            );
            store.delete(record.track_id).await?;
            Ok(None)
        }
    }
}

/// Position store backed by the library database
#[derive(Debug, Clone)]
pub struct SqlitePositionStore {
    pool: DbPool,
}

impl SqlitePositionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PositionStore for SqlitePositionStore {
    async fn save(&self, record: &PositionRecord) -> Result<()> {
        queries::upsert_position(&self.pool, record).await
    }

    async fn restore(&self, track: TrackId) -> Result<Option<PositionRecord>> {
        queries::get_position(&self.pool, track).await
    }

    async fn latest(&self) -> Result<Option<PositionRecord>> {
        queries::get_latest_position(&self.pool).await
    }

    async fn delete(&self, track: TrackId) -> Result<()> {
        queries::delete_position(&self.pool, track).await
    }
}

enum WriteRequest {
    Save {
        record: PositionRecord,
        done: Option<oneshot::Sender<()>>,
    },
    Flush(oneshot::Sender<()>),
}

/// Background task applying position saves in the order they were queued
#[derive(Debug, Clone)]
pub struct PositionWriter {
    tx: mpsc::UnboundedSender<WriteRequest>,
}

impl std::fmt::Debug for WriteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Save { record, .. } => write!(f, "Save({})", record.track_id),
            Self::Flush(_) => write!(f, "Flush"),
        }
    }
}

impl PositionWriter {
    /// Spawns the writer on the current Tokio runtime
    ///
    /// The task ends once every writer handle is dropped and the queue drained.
    pub fn spawn(store: Arc<dyn PositionStore>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteRequest>();

        let handle = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match request {
                    WriteRequest::Save { record, done } => {
                        if let Err(e) = store.save(&record).await {
                            log::warn!(
                                "Failed to save position for track {}: {}",
                                record.track_id,
                                e
                            );
                        }
                        if let Some(done) = done {
                            let _ = done.send(());
                        }
                    }
                    WriteRequest::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            log::debug!("Position writer stopped");
        });

        (Self { tx }, handle)
    }

    /// Queues a save without waiting for it
    pub fn save(&self, record: PositionRecord) {
        self.send(WriteRequest::Save { record, done: None });
    }

    /// Queues a save and waits until the store has handled it
    ///
    /// Store failures are logged by the writer, not returned.
    pub async fn save_and_wait(&self, record: PositionRecord) {
        let (done, wait) = oneshot::channel();
        if self.send(WriteRequest::Save {
            record,
            done: Some(done),
        }) {
            let _ = wait.await;
        }
    }

    /// Waits until every previously queued save has been handled
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.send(WriteRequest::Flush(done)) {
            let _ = wait.await;
        }
    }

    fn send(&self, request: WriteRequest) -> bool {
        match self.tx.send(request) {
            Ok(()) => true,
            Err(mpsc::error::SendError(request)) => {
                log::warn!("Position writer is gone, dropping {:?}", request);
                false
            }
        }
    }
}
