//! Room storage backends.
//!
//! The engine only needs a key/value collection of rooms keyed by exact room
//! id. Backends own no lifecycle rules: emptiness checks and purges live in
//! the engine, which also serializes access per room.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::engine::room::Room;
use crate::error::StoreError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Create an empty room, or return the existing one unchanged.
    async fn create(&self, room_id: &str) -> Result<Room, StoreError>;

    async fn get(&self, room_id: &str) -> Result<Option<Room>, StoreError>;

    /// Write back a room's messages and members. A room that no longer
    /// exists is left absent.
    async fn update(&self, room: &Room) -> Result<(), StoreError>;

    /// Remove a room and everything in it. Removing an absent room is not an error.
    async fn delete(&self, room_id: &str) -> Result<(), StoreError>;

    /// Ids of every stored room.
    async fn room_ids(&self) -> Result<Vec<String>, StoreError>;
}
