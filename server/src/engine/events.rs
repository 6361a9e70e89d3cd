use serde::{Deserialize, Serialize};

use super::room::{Message, Room};

/// Read-only view of a room as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub messages: Vec<Message>,
    pub active_users: usize,
    pub exists: bool,
}

impl RoomSnapshot {
    /// The snapshot of a room that does not exist.
    pub fn absent() -> Self {
        Self {
            messages: Vec::new(),
            active_users: 0,
            exists: false,
        }
    }
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            messages: room.messages.snapshot(),
            active_users: room.active_users(),
            exists: true,
        }
    }
}

/// Why a room was purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The last participant left.
    Empty,
    /// A host closed the room explicitly.
    Host,
}

/// Change notification pushed to room observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// The room changed; carries the full current state.
    #[serde(rename_all = "camelCase")]
    Update {
        messages: Vec<Message>,
        active_users: usize,
    },

    /// The room was purged. No further events follow for this room id
    /// until it is created again.
    Closed { reason: CloseReason },
}

impl RoomEvent {
    pub fn update(room: &Room) -> Self {
        RoomEvent::Update {
            messages: room.messages.snapshot(),
            active_users: room.active_users(),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, RoomEvent::Closed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(RoomSnapshot::absent()).unwrap();
        assert_eq!(json["exists"], false);
        assert_eq!(json["activeUsers"], 0);
        assert_eq!(json["messages"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_update_event_tagged() {
        let mut room = Room::new("r".into());
        room.members.join("a".into());
        let json = serde_json::to_value(RoomEvent::update(&room)).unwrap();
        assert_eq!(json["type"], "update");
        assert_eq!(json["activeUsers"], 1);
    }

    #[test]
    fn test_closed_event_tagged() {
        let event = RoomEvent::Closed {
            reason: CloseReason::Host,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "closed");
        assert_eq!(json["reason"], "host");
        assert!(event.is_closed());
    }
}
