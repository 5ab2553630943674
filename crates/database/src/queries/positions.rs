//! Saved listening position operations

use crate::DbPool;
use sqlx::Row;
use talebox_core::{AppError, Duration, PlaybackSpeed, PositionRecord, Timestamp, TrackId};

/// Creates or replaces the saved position of a track
pub async fn upsert_position(pool: &DbPool, record: &PositionRecord) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO positions (track_id, position_ms, duration_ms, speed, saved_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(track_id) DO UPDATE SET
            position_ms = excluded.position_ms,
            duration_ms = excluded.duration_ms,
            speed = excluded.speed,
            saved_at = excluded.saved_at
        "#,
    )
    .bind(record.track_id.as_string())
    .bind(record.position.as_millis() as i64)
    .bind(record.duration.as_millis() as i64)
    .bind(record.speed.value() as f64)
    .bind(record.saved_at.as_millis())
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to save position", e))?;

    Ok(())
}

/// Gets the saved position of a track, if any
pub async fn get_position(
    pool: &DbPool,
    track_id: TrackId,
) -> Result<Option<PositionRecord>, AppError> {
    let row = sqlx::query(
        "SELECT track_id, position_ms, duration_ms, speed, saved_at FROM positions WHERE track_id = ?",
    )
    .bind(track_id.as_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch position", e))?;

    row.map(row_to_position).transpose()
}

/// Gets the most recently saved position across the whole library
pub async fn get_latest_position(pool: &DbPool) -> Result<Option<PositionRecord>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT track_id, position_ms, duration_ms, speed, saved_at
        FROM positions ORDER BY saved_at DESC LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch latest position", e))?;

    row.map(row_to_position).transpose()
}

/// Deletes the saved position of a track
pub async fn delete_position(pool: &DbPool, track_id: TrackId) -> Result<(), AppError> {
    sqlx::query("DELETE FROM positions WHERE track_id = ?")
        .bind(track_id.as_string())
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to delete position", e))?;

    Ok(())
}

fn row_to_position(row: sqlx::sqlite::SqliteRow) -> Result<PositionRecord, AppError> {
    let track_id_str: String = row
        .try_get("track_id")
        .map_err(|e| AppError::database("Missing track ID", e))?;
    let track_id = TrackId::from_string(&track_id_str)
        .map_err(|e| AppError::database("Invalid track ID", e))?;

    let position_ms: i64 = row
        .try_get("position_ms")
        .map_err(|e| AppError::database("Missing position", e))?;
    let duration_ms: i64 = row
        .try_get("duration_ms")
        .map_err(|e| AppError::database("Missing duration", e))?;
    let speed: f64 = row
        .try_get("speed")
        .map_err(|e| AppError::database("Missing speed", e))?;
    let saved_at: i64 = row
        .try_get("saved_at")
        .map_err(|e| AppError::database("Missing saved_at", e))?;

    Ok(PositionRecord {
        track_id,
        position: Duration::from_millis(position_ms.max(0) as u64),
        duration: Duration::from_millis(duration_ms.max(0) as u64),
        speed: PlaybackSpeed::new_unchecked(speed as f32),
        saved_at: Timestamp::from_millis(saved_at),
    })
}
