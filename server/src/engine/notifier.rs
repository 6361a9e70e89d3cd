use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use super::events::RoomEvent;

/// Per-room event buffer. A subscriber that falls further behind than this
/// skips ahead; every update carries the full room state, so nothing is lost
/// but intermediate frames.
pub const ROOM_EVENT_BUFFER: usize = 64;

/// Hook the engine calls after each committed mutation.
///
/// Called while the room's lock is held, so implementations must not block
/// and must not call back into the engine.
pub trait RoomObserver: Send + Sync {
    fn on_event(&self, room_id: &str, event: &RoomEvent);
}

/// Fans room events out to any number of subscribers through one
/// `broadcast` channel per room.
pub struct RoomBroadcaster {
    channels: DashMap<String, broadcast::Sender<RoomEvent>>,
    capacity: usize,
}

impl Default for RoomBroadcaster {
    fn default() -> Self {
        Self::new(ROOM_EVENT_BUFFER)
    }
}

impl RoomBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a room's events. Subscribe before joining so that a
    /// close racing the join is still observed.
    pub fn subscribe(&self, room_id: &str) -> broadcast::Receiver<RoomEvent> {
        self.channels
            .entry(room_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop a room's channel if nobody is listening any more.
    pub fn prune(&self, room_id: &str) {
        self.channels
            .remove_if(room_id, |_, tx| tx.receiver_count() == 0);
    }

    pub fn subscriber_count(&self, room_id: &str) -> usize {
        self.channels
            .get(room_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl RoomObserver for RoomBroadcaster {
    fn on_event(&self, room_id: &str, event: &RoomEvent) {
        if event.is_closed() {
            // Last event on this channel; receivers see it, then the sender is gone.
            if let Some((_, tx)) = self.channels.remove(room_id) {
                let _ = tx.send(event.clone());
            }
            return;
        }

        if let Some(tx) = self.channels.get(room_id)
            && tx.send(event.clone()).is_err()
        {
            debug!(%room_id, "no subscribers for room event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::CloseReason;

    fn update(active_users: usize) -> RoomEvent {
        RoomEvent::Update {
            messages: vec![],
            active_users,
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_updates() {
        let broadcaster = RoomBroadcaster::default();
        let mut rx1 = broadcaster.subscribe("r1");
        let mut rx2 = broadcaster.subscribe("r1");

        broadcaster.on_event("r1", &update(2));

        assert_eq!(rx1.recv().await.unwrap(), update(2));
        assert_eq!(rx2.recv().await.unwrap(), update(2));
        assert_eq!(broadcaster.subscriber_count("r1"), 2);
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let broadcaster = RoomBroadcaster::default();
        let mut rx_a = broadcaster.subscribe("a");
        let _rx_b = broadcaster.subscribe("b");

        broadcaster.on_event("b", &update(1));

        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_delivers_then_drops_channel() {
        let broadcaster = RoomBroadcaster::default();
        let mut rx = broadcaster.subscribe("r1");

        let closed = RoomEvent::Closed {
            reason: CloseReason::Empty,
        };
        broadcaster.on_event("r1", &closed);

        assert_eq!(rx.recv().await.unwrap(), closed);
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert_eq!(broadcaster.channel_count(), 0);
    }

    #[test]
    fn test_event_without_subscribers_is_dropped() {
        let broadcaster = RoomBroadcaster::default();
        broadcaster.on_event("nobody", &update(0));
        assert_eq!(broadcaster.channel_count(), 0);
    }

    #[test]
    fn test_prune_keeps_listened_channels() {
        let broadcaster = RoomBroadcaster::default();
        let rx = broadcaster.subscribe("r1");
        broadcaster.prune("r1");
        assert_eq!(broadcaster.channel_count(), 1);

        drop(rx);
        broadcaster.prune("r1");
        assert_eq!(broadcaster.channel_count(), 0);
    }
}
