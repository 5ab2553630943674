//! Track catalog access

use async_trait::async_trait;
use talebox_core::{AppError, Collection, CollectionId, Result, Track, TrackId};
use talebox_database::{queries, DbPool};

/// Read access to collections and their ordered tracks
///
/// Neighbour lookups are linear in the collection size, which stays in the
/// tens to low hundreds of tracks.
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Tracks ordered by ordinal, then name; an unknown collection is empty
    async fn list_tracks(&self, collection: CollectionId) -> Result<Vec<Track>>;

    async fn get_track(&self, id: TrackId) -> Result<Option<Track>>;

    async fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>>;

    /// Track after `current`, none at the end of the collection
    async fn next(&self, collection: CollectionId, current: TrackId) -> Result<Option<Track>> {
        let tracks = self.list_tracks(collection).await?;
        Ok(tracks
            .iter()
            .position(|t| t.id == current)
            .and_then(|i| tracks.get(i + 1))
            .cloned())
    }

    /// Track before `current`, none at the start of the collection
    async fn previous(
        &self,
        collection: CollectionId,
        current: TrackId,
    ) -> Result<Option<Track>> {
        let tracks = self.list_tracks(collection).await?;
        Ok(tracks
            .iter()
            .position(|t| t.id == current)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| tracks.get(i))
            .cloned())
    }
}

/// Catalog backed by the library database
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: DbPool,
}

impl SqliteCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AppError::RecordNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl TrackCatalog for SqliteCatalog {
    async fn list_tracks(&self, collection: CollectionId) -> Result<Vec<Track>> {
        queries::get_collection_tracks(&self.pool, collection).await
    }

    async fn get_track(&self, id: TrackId) -> Result<Option<Track>> {
        found(queries::get_track(&self.pool, id).await)
    }

    async fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>> {
        found(queries::get_collection(&self.pool, id).await)
    }
}
