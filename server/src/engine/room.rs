use std::collections::{HashSet, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of messages a room keeps. Older messages are evicted first.
pub const MESSAGE_HISTORY_LIMIT: usize = 100;

/// Identifies one logical client session's presence in a room.
///
/// Minted by the transport layer; the engine only compares them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh id for a server-side stream.
    pub fn generate() -> Self {
        Self(format!("conn_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A chat message. Immutable once appended to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Time-ordered (UUIDv7), so ids sort in posting order.
    pub id: String,
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(username: String, text: String) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            username,
            text,
            timestamp: Utc::now(),
        }
    }
}

/// Bounded, append-only message history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    entries: VecDeque<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, evicting from the front until the log fits the limit.
    pub fn append(&mut self, message: Message) {
        self.entries.push_back(message);
        while self.entries.len() > MESSAGE_HISTORY_LIMIT {
            self.entries.pop_front();
        }
    }

    /// Owned copy of the history, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<Message>> for MessageLog {
    fn from(messages: Vec<Message>) -> Self {
        let mut log = MessageLog::new();
        for message in messages {
            log.append(message);
        }
        log
    }
}

/// Live connections in a room. A set, so duplicate joins never double-count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipSet {
    members: HashSet<ConnectionId>,
}

impl MembershipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the connection was not already present.
    pub fn join(&mut self, connection_id: ConnectionId) -> bool {
        self.members.insert(connection_id)
    }

    /// Returns true if the connection was present and has been removed.
    pub fn leave(&mut self, connection_id: &ConnectionId) -> bool {
        self.members.remove(connection_id)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.members.contains(connection_id)
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionId> {
        self.members.iter()
    }
}

impl FromIterator<ConnectionId> for MembershipSet {
    fn from_iter<I: IntoIterator<Item = ConnectionId>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

/// State for a single live room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub messages: MessageLog,
    pub members: MembershipSet,
}

impl Room {
    pub fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            messages: MessageLog::new(),
            members: MembershipSet::new(),
        }
    }

    pub fn active_users(&self) -> usize {
        self.members.count()
    }
}
