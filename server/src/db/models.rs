use chrono::{DateTime, Utc};

/// A stored room. `messages` and `members` are JSON arrays.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub messages: String,
    pub members: String,
}
