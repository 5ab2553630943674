//! In-memory catalog and position store
//!
//! Useful for embedding the session without a database and for tests. The
//! store can be switched to "unavailable" to exercise persistence failures.

use crate::catalog::TrackCatalog;
use crate::persistence::PositionStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use talebox_core::{
    AppError, Collection, CollectionId, Duration, PositionRecord, Result, Track, TrackId,
};

#[derive(Debug, Default)]
struct Library {
    collections: HashMap<CollectionId, Collection>,
    tracks: Vec<Track>,
    positions: HashMap<TrackId, PositionRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryLibrary {
    inner: Mutex<Library>,
    unavailable: AtomicBool,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Library>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseLocked {
                operation: "memory library marked unavailable".to_string(),
            });
        }
        self.inner.lock().map_err(|_| AppError::InternalError {
            message: "memory library lock poisoned".to_string(),
        })
    }

    /// Makes every operation fail until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn insert_collection(&self, collection: Collection) {
        if let Ok(mut library) = self.inner.lock() {
            library.collections.insert(collection.id, collection);
        }
    }

    pub fn insert_track(&self, track: Track) {
        if let Ok(mut library) = self.inner.lock() {
            library.tracks.retain(|t| t.id != track.id);
            library.tracks.push(track);
        }
    }

    /// Removes a track together with its saved position
    pub fn remove_track(&self, id: TrackId) {
        if let Ok(mut library) = self.inner.lock() {
            library.tracks.retain(|t| t.id != id);
            library.positions.remove(&id);
        }
    }

    /// Adds a collection with one track per duration, under `/books/<title>`
    pub fn add_collection(
        &self,
        title: &str,
        skip_start_secs: u32,
        skip_end_secs: u32,
        durations_ms: &[u64],
    ) -> (Collection, Vec<Track>) {
        let directory = Path::new("/books").join(title);
        self.add_collection_in(&directory, title, skip_start_secs, skip_end_secs, durations_ms)
    }

    /// Adds a collection whose track paths live in `directory`
    ///
    /// Files are not created.
    pub fn add_collection_in(
        &self,
        directory: &Path,
        title: &str,
        skip_start_secs: u32,
        skip_end_secs: u32,
        durations_ms: &[u64],
    ) -> (Collection, Vec<Track>) {
        let collection = Collection::new(title, directory.to_path_buf())
            .with_skips(skip_start_secs, skip_end_secs);
        self.insert_collection(collection.clone());

        let tracks: Vec<Track> = durations_ms
            .iter()
            .enumerate()
            .map(|(i, &duration)| {
                let ordinal = i as u32 + 1;
                Track::new(
                    collection.id,
                    format!("{:02}", ordinal),
                    directory.join(format!("{:02}.mp3", ordinal)),
                    ordinal,
                    Duration::from_millis(duration),
                )
            })
            .collect();

        for track in &tracks {
            self.insert_track(track.clone());
        }
        (collection, tracks)
    }
}

#[async_trait]
impl TrackCatalog for MemoryLibrary {
    async fn list_tracks(&self, collection: CollectionId) -> Result<Vec<Track>> {
        let library = self.lock()?;
        let mut tracks: Vec<Track> = library
            .tracks
            .iter()
            .filter(|t| t.collection_id == collection)
            .cloned()
            .collect();
        tracks.sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then_with(|| a.name.cmp(&b.name)));
        Ok(tracks)
    }

    async fn get_track(&self, id: TrackId) -> Result<Option<Track>> {
        Ok(self.lock()?.tracks.iter().find(|t| t.id == id).cloned())
    }

    async fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>> {
        Ok(self.lock()?.collections.get(&id).cloned())
    }
}

#[async_trait]
impl PositionStore for MemoryLibrary {
    async fn save(&self, record: &PositionRecord) -> Result<()> {
        self.lock()?.positions.insert(record.track_id, record.clone());
        Ok(())
    }

    async fn restore(&self, track: TrackId) -> Result<Option<PositionRecord>> {
        Ok(self.lock()?.positions.get(&track).cloned())
    }

    async fn latest(&self) -> Result<Option<PositionRecord>> {
        Ok(self
            .lock()?
            .positions
            .values()
            .max_by_key(|r| r.saved_at)
            .cloned())
    }

    async fn delete(&self, track: TrackId) -> Result<()> {
        self.lock()?.positions.remove(&track);
        Ok(())
    }
}
