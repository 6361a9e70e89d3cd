use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::RoomStore;
use crate::db::models::RoomRow;
use crate::db::queries::rooms as queries;
use crate::engine::room::{ConnectionId, MembershipSet, Message, MessageLog, Room};
use crate::error::StoreError;

/// Room store backed by a SQLite database: one row per live room.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap a pool whose migrations have already been applied.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decode_row(row: RoomRow) -> Result<Room, StoreError> {
    let messages: Vec<Message> = serde_json::from_str(&row.messages)?;
    let members: Vec<ConnectionId> = serde_json::from_str(&row.members)?;
    Ok(Room {
        id: row.id,
        created_at: row.created_at,
        messages: MessageLog::from(messages),
        members: members.into_iter().collect::<MembershipSet>(),
    })
}

#[async_trait]
impl RoomStore for SqliteStore {
    async fn create(&self, room_id: &str) -> Result<Room, StoreError> {
        queries::insert_room_if_absent(&self.pool, room_id, Utc::now()).await?;
        let row = queries::get_room(&self.pool, room_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt {
                room_id: room_id.to_string(),
                reason: "row missing right after insert".into(),
            })?;
        decode_row(row)
    }

    async fn get(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
        queries::get_room(&self.pool, room_id)
            .await?
            .map(decode_row)
            .transpose()
    }

    async fn update(&self, room: &Room) -> Result<(), StoreError> {
        let messages = serde_json::to_string(&room.messages.iter().collect::<Vec<_>>())?;
        let members = serde_json::to_string(&room.members.iter().collect::<Vec<_>>())?;
        queries::update_room(&self.pool, &room.id, &messages, &members).await?;
        Ok(())
    }

    async fn delete(&self, room_id: &str) -> Result<(), StoreError> {
        queries::delete_room(&self.pool, room_id).await?;
        Ok(())
    }

    async fn room_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(queries::list_room_ids(&self.pool).await?)
    }
}
