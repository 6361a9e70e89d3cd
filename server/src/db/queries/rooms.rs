use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::RoomRow;

/// Insert an empty room unless one with this id already exists.
/// Returns true if a row was inserted.
pub async fn insert_room_if_absent(
    pool: &SqlitePool,
    room_id: &str,
    created_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("INSERT OR IGNORE INTO rooms (id, created_at) VALUES (?, ?)")
        .bind(room_id)
        .bind(created_at)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Get a room by its exact id.
pub async fn get_room(pool: &SqlitePool, room_id: &str) -> Result<Option<RoomRow>, sqlx::Error> {
    sqlx::query_as::<_, RoomRow>(
        "SELECT id, created_at, messages, members FROM rooms WHERE id = ?",
    )
    .bind(room_id)
    .fetch_optional(pool)
    .await
}

/// Overwrite a room's message and member documents. Returns true if the room existed.
pub async fn update_room(
    pool: &SqlitePool,
    room_id: &str,
    messages: &str,
    members: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE rooms SET messages = ?, members = ? WHERE id = ?")
        .bind(messages)
        .bind(members)
        .bind(room_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a room row.
pub async fn delete_room(pool: &SqlitePool, room_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM rooms WHERE id = ?")
        .bind(room_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// List every stored room id.
pub async fn list_room_ids(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM rooms ORDER BY created_at")
        .fetch_all(pool)
        .await
}
