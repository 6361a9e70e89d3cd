use async_trait::async_trait;
use dashmap::DashMap;

use super::RoomStore;
use crate::engine::room::Room;
use crate::error::StoreError;

/// Process-local room store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    rooms: DashMap<String, Room>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn create(&self, room_id: &str) -> Result<Room, StoreError> {
        let room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(room_id.to_string()));
        Ok(room.clone())
    }

    async fn get(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.get(room_id).map(|r| r.clone()))
    }

    async fn update(&self, room: &Room) -> Result<(), StoreError> {
        if let Some(mut existing) = self.rooms.get_mut(&room.id) {
            existing.messages = room.messages.clone();
            existing.members = room.members.clone();
        }
        Ok(())
    }

    async fn delete(&self, room_id: &str) -> Result<(), StoreError> {
        self.rooms.remove(room_id);
        Ok(())
    }

    async fn room_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.rooms.iter().map(|r| r.key().clone()).collect())
    }
}
