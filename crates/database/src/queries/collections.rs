//! Collection database operations

use crate::DbPool;
use sqlx::Row;
use std::path::PathBuf;
use talebox_core::{AppError, Collection, CollectionId, Timestamp};

const COLLECTION_COLUMNS: &str =
    "id, title, author, directory, skip_start_secs, skip_end_secs, is_favorite, added_date";

/// Creates a new collection
pub async fn create_collection(pool: &DbPool, collection: &Collection) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO collections (
            id, title, author, directory, skip_start_secs, skip_end_secs, is_favorite, added_date
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(collection.id.as_string())
    .bind(&collection.title)
    .bind(&collection.author)
    .bind(collection.directory.to_string_lossy().into_owned())
    .bind(collection.skip_start_secs as i64)
    .bind(collection.skip_end_secs as i64)
    .bind(collection.is_favorite as i64)
    .bind(collection.added_date.as_millis())
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to create collection", e))?;

    Ok(())
}

/// Gets a collection by ID
pub async fn get_collection(pool: &DbPool, id: CollectionId) -> Result<Collection, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM collections WHERE id = ?",
        COLLECTION_COLUMNS
    ))
    .bind(id.as_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch collection", e))?
    .ok_or_else(|| AppError::not_found("Collection", id))?;

    row_to_collection(row)
}

/// Lists all collections ordered by title
pub async fn list_collections(pool: &DbPool) -> Result<Vec<Collection>, AppError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM collections ORDER BY title COLLATE NOCASE",
        COLLECTION_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to list collections", e))?;

    rows.into_iter().map(row_to_collection).collect()
}

/// Lists favorite collections ordered by title
pub async fn get_favorite_collections(pool: &DbPool) -> Result<Vec<Collection>, AppError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM collections WHERE is_favorite = 1 ORDER BY title COLLATE NOCASE",
        COLLECTION_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to list favorite collections", e))?;

    rows.into_iter().map(row_to_collection).collect()
}

/// Updates the lead-in and lead-out seconds of a collection
pub async fn update_skip_settings(
    pool: &DbPool,
    id: CollectionId,
    skip_start_secs: u32,
    skip_end_secs: u32,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE collections SET skip_start_secs = ?, skip_end_secs = ? WHERE id = ?",
    )
    .bind(skip_start_secs as i64)
    .bind(skip_end_secs as i64)
    .bind(id.as_string())
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to update skip settings", e))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Collection", id));
    }

    Ok(())
}

/// Marks or unmarks a collection as favorite
pub async fn set_favorite(pool: &DbPool, id: CollectionId, favorite: bool) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE collections SET is_favorite = ? WHERE id = ?")
        .bind(favorite as i64)
        .bind(id.as_string())
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to update favorite flag", e))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Collection", id));
    }

    Ok(())
}

/// Deletes a collection together with its tracks and saved positions
pub async fn delete_collection(pool: &DbPool, id: CollectionId) -> Result<(), AppError> {
    sqlx::query("DELETE FROM collections WHERE id = ?")
        .bind(id.as_string())
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to delete collection", e))?;

    Ok(())
}

pub(crate) fn row_to_collection(row: sqlx::sqlite::SqliteRow) -> Result<Collection, AppError> {
    let id_str: String = row
        .try_get("id")
        .map_err(|e| AppError::database("Missing collection ID", e))?;
    let id = CollectionId::from_string(&id_str)
        .map_err(|e| AppError::database("Invalid collection ID", e))?;

    let directory: String = row
        .try_get("directory")
        .map_err(|e| AppError::database("Missing directory", e))?;
    let skip_start: i64 = row
        .try_get("skip_start_secs")
        .map_err(|e| AppError::database("Missing skip_start_secs", e))?;
    let skip_end: i64 = row
        .try_get("skip_end_secs")
        .map_err(|e| AppError::database("Missing skip_end_secs", e))?;
    let is_favorite: i64 = row
        .try_get("is_favorite")
        .map_err(|e| AppError::database("Missing is_favorite", e))?;
    let added_date: i64 = row
        .try_get("added_date")
        .map_err(|e| AppError::database("Missing added_date", e))?;

    Ok(Collection {
        id,
        title: row
            .try_get("title")
            .map_err(|e| AppError::database("Missing title", e))?,
        author: row.try_get("author").ok().flatten(),
        directory: PathBuf::from(directory),
        skip_start_secs: skip_start.max(0) as u32,
        skip_end_secs: skip_end.max(0) as u32,
        is_favorite: is_favorite != 0,
        added_date: Timestamp::from_millis(added_date),
    })
}
