//! Track database operations

use crate::DbPool;
use sqlx::Row;
use std::path::PathBuf;
use talebox_core::{AppError, CollectionId, Duration, Track, TrackId};

const TRACK_COLUMNS: &str = "id, collection_id, file_path, name, file_size, duration_ms, ordinal";

/// Creates a new track
pub async fn create_track(pool: &DbPool, track: &Track) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO tracks (id, collection_id, file_path, name, file_size, duration_ms, ordinal)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(track.id.as_string())
    .bind(track.collection_id.as_string())
    .bind(track.file_path.to_string_lossy().into_owned())
    .bind(&track.name)
    .bind(track.file_size as i64)
    .bind(track.duration.as_millis() as i64)
    .bind(track.ordinal as i64)
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to create track", e))?;

    Ok(())
}

/// Gets a track by ID
pub async fn get_track(pool: &DbPool, id: TrackId) -> Result<Track, AppError> {
    let row = sqlx::query(&format!("SELECT {} FROM tracks WHERE id = ?", TRACK_COLUMNS))
        .bind(id.as_string())
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::database("Failed to fetch track", e))?
        .ok_or_else(|| AppError::not_found("Track", id))?;

    row_to_track(row)
}

/// Gets all tracks of a collection, ordered by ordinal then name
///
/// An unknown collection yields an empty list.
pub async fn get_collection_tracks(
    pool: &DbPool,
    collection_id: CollectionId,
) -> Result<Vec<Track>, AppError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tracks WHERE collection_id = ? ORDER BY ordinal, name",
        TRACK_COLUMNS
    ))
    .bind(collection_id.as_string())
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to get collection tracks", e))?;

    rows.into_iter().map(row_to_track).collect()
}

/// Records a lazily resolved duration
pub async fn update_track_duration(
    pool: &DbPool,
    id: TrackId,
    duration: Duration,
) -> Result<(), AppError> {
    sqlx::query("UPDATE tracks SET duration_ms = ? WHERE id = ?")
        .bind(duration.as_millis() as i64)
        .bind(id.as_string())
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to update track duration", e))?;

    Ok(())
}

/// Moves a track to a new ordinal after a re-scan
pub async fn update_track_ordinal(pool: &DbPool, id: TrackId, ordinal: u32) -> Result<(), AppError> {
    sqlx::query("UPDATE tracks SET ordinal = ? WHERE id = ?")
        .bind(ordinal as i64)
        .bind(id.as_string())
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to update track ordinal", e))?;

    Ok(())
}

/// Deletes a track and its saved position
pub async fn delete_track(pool: &DbPool, id: TrackId) -> Result<(), AppError> {
    sqlx::query("DELETE FROM tracks WHERE id = ?")
        .bind(id.as_string())
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to delete track", e))?;

    Ok(())
}

pub(crate) fn row_to_track(row: sqlx::sqlite::SqliteRow) -> Result<Track, AppError> {
    let id_str: String = row
        .try_get("id")
        .map_err(|e| AppError::database("Missing track ID", e))?;
    let id = TrackId::from_string(&id_str).map_err(|e| AppError::database("Invalid track ID", e))?;

    let collection_id_str: String = row
        .try_get("collection_id")
        .map_err(|e| AppError::database("Missing collection ID", e))?;
    let collection_id = CollectionId::from_string(&collection_id_str)
        .map_err(|e| AppError::database("Invalid collection ID", e))?;

    let file_path: String = row
        .try_get("file_path")
        .map_err(|e| AppError::database("Missing file path", e))?;
    let file_size: i64 = row
        .try_get("file_size")
        .map_err(|e| AppError::database("Missing file size", e))?;
    let duration_ms: i64 = row
        .try_get("duration_ms")
        .map_err(|e| AppError::database("Missing duration", e))?;
    let ordinal: i64 = row
        .try_get("ordinal")
        .map_err(|e| AppError::database("Missing ordinal", e))?;

    Ok(Track {
        id,
        collection_id,
        file_path: PathBuf::from(file_path),
        name: row
            .try_get("name")
            .map_err(|e| AppError::database("Missing name", e))?,
        file_size: file_size.max(0) as u64,
        duration: Duration::from_millis(duration_ms.max(0) as u64),
        ordinal: ordinal.max(0) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_in_memory;
    use crate::migrations::run_migrations;
    use crate::queries::collections::{create_collection, delete_collection};
    use talebox_core::Collection;

    async fn setup() -> (DbPool, Collection) {
        let pool = connect_in_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let collection = Collection::new("Test", PathBuf::from("/books/test"));
        create_collection(&pool, &collection).await.unwrap();
        (pool, collection)
    }

    fn track(collection: &Collection, name: &str, ordinal: u32) -> Track {
        Track::new(
            collection.id,
            name,
            collection.directory.join(format!("{}.mp3", name)),
            ordinal,
            Duration::from_seconds(60),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_track() {
        let (pool, collection) = setup().await;
        let mut t = track(&collection, "01", 1);
        t.file_size = 4096;
        create_track(&pool, &t).await.unwrap();

        let retrieved = get_track(&pool, t.id).await.unwrap();
        assert_eq!(retrieved, t);
    }

    #[tokio::test]
    async fn test_tracks_ordered_by_ordinal_then_name() {
        let (pool, collection) = setup().await;
        let c = track(&collection, "c", 2);
        let b = track(&collection, "b", 1);
        let a = track(&collection, "a", 1);
        for t in [&c, &b, &a] {
            create_track(&pool, t).await.unwrap();
        }

        let tracks = get_collection_tracks(&pool, collection.id).await.unwrap();
        let names: Vec<&str> = tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unknown_collection_has_no_tracks() {
        let (pool, _) = setup().await;
        let tracks = get_collection_tracks(&pool, CollectionId::new()).await.unwrap();
        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn test_duration_backfill() {
        let (pool, collection) = setup().await;
        let mut t = track(&collection, "01", 1);
        t.duration = Duration::ZERO;
        create_track(&pool, &t).await.unwrap();

        update_track_duration(&pool, t.id, Duration::from_millis(12_345))
            .await
            .unwrap();

        let retrieved = get_track(&pool, t.id).await.unwrap();
        assert_eq!(retrieved.duration, Duration::from_millis(12_345));
    }

    #[tokio::test]
    async fn test_update_ordinal() {
        let (pool, collection) = setup().await;
        let t = track(&collection, "01", 1);
        create_track(&pool, &t).await.unwrap();

        update_track_ordinal(&pool, t.id, 7).await.unwrap();
        assert_eq!(get_track(&pool, t.id).await.unwrap().ordinal, 7);
    }

    #[tokio::test]
    async fn test_collection_delete_cascades_to_tracks() {
        let (pool, collection) = setup().await;
        let t = track(&collection, "01", 1);
        create_track(&pool, &t).await.unwrap();

        delete_collection(&pool, collection.id).await.unwrap();

        assert!(get_track(&pool, t.id).await.is_err());
    }
}
