use thiserror::Error;

/// Failure inside a room store backend. Never means "room does not exist":
/// absence is reported as `Ok(None)` by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("corrupt room record {room_id}: {reason}")]
    Corrupt { room_id: String, reason: String },
}

/// Errors returned by the room engine's public operations.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RoomError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RoomError::RoomNotFound(_))
    }
}
