//! Collection (book) and track domain models

use crate::types::{Duration, Timestamp, Validator};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(Uuid);

impl CollectionId {
    /// Creates a new random CollectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a CollectionId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Returns the CollectionId as a string
    pub fn as_string(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Creates a new random TrackId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a TrackId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Returns the TrackId as a string
    pub fn as_string(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An audiobook: an ordered set of tracks sharing skip configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub title: String,
    pub author: Option<String>,
    /// Directory the collection was imported from
    pub directory: PathBuf,
    /// Seconds skipped at the start of every track (lead-in)
    pub skip_start_secs: u32,
    /// Seconds before a track's end at which it counts as finished (lead-out)
    pub skip_end_secs: u32,
    pub is_favorite: bool,
    pub added_date: Timestamp,
}

impl Collection {
    /// Creates a collection with no skip configuration
    pub fn new(title: impl Into<String>, directory: PathBuf) -> Self {
        Self {
            id: CollectionId::new(),
            title: title.into(),
            author: None,
            directory,
            skip_start_secs: 0,
            skip_end_secs: 0,
            is_favorite: false,
            added_date: Timestamp::now(),
        }
    }

    /// Sets lead-in and lead-out seconds
    pub fn with_skips(mut self, skip_start_secs: u32, skip_end_secs: u32) -> Self {
        self.skip_start_secs = skip_start_secs;
        self.skip_end_secs = skip_end_secs;
        self
    }
}

impl Validator for Collection {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A single audio file within a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub collection_id: CollectionId,
    pub file_path: PathBuf,
    pub name: String,
    pub file_size: u64,
    /// Zero until the catalog backfills it
    pub duration: Duration,
    pub ordinal: u32,
}

impl Track {
    /// Creates a new track belonging to `collection_id`
    pub fn new(
        collection_id: CollectionId,
        name: impl Into<String>,
        file_path: PathBuf,
        ordinal: u32,
        duration: Duration,
    ) -> Self {
        Self {
            id: TrackId::new(),
            collection_id,
            file_path,
            name: name.into(),
            file_size: 0,
            duration,
            ordinal,
        }
    }

    /// Returns true once the track's duration is known
    pub fn has_duration(&self) -> bool {
        !self.duration.is_zero()
    }
}

impl Validator for Track {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Track name cannot be empty".to_string());
        }

        if self.file_path.as_os_str().is_empty() {
            errors.push("File path cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_id_round_trip() {
        let id = CollectionId::new();
        let parsed = CollectionId::from_string(&id.as_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_track_id_invalid_string() {
        assert!(TrackId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_collection_defaults() {
        let collection = Collection::new("Dune", PathBuf::from("/books/dune"));
        assert_eq!(collection.skip_start_secs, 0);
        assert_eq!(collection.skip_end_secs, 0);
        assert!(!collection.is_favorite);
        assert!(collection.is_valid());
    }

    #[test]
    fn test_collection_with_skips() {
        let collection = Collection::new("Dune", PathBuf::from("/books/dune")).with_skips(12, 30);
        assert_eq!(collection.skip_start_secs, 12);
        assert_eq!(collection.skip_end_secs, 30);
    }

    #[test]
    fn test_collection_empty_title_invalid() {
        let collection = Collection::new("  ", PathBuf::from("/books/x"));
        assert!(!collection.is_valid());
    }

    #[test]
    fn test_track_duration_unresolved() {
        let track = Track::new(
            CollectionId::new(),
            "01 - Opening",
            PathBuf::from("/books/dune/01.mp3"),
            1,
            Duration::ZERO,
        );
        assert!(!track.has_duration());
        assert!(track.is_valid());
    }

    #[test]
    fn test_track_empty_path_invalid() {
        let track = Track::new(CollectionId::new(), "x", PathBuf::new(), 1, Duration::ZERO);
        assert!(!track.is_valid());
    }
}
