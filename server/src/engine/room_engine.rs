use std::hash::{BuildHasher, RandomState};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::events::{CloseReason, RoomEvent, RoomSnapshot};
use super::notifier::RoomObserver;
use super::room::{ConnectionId, Message};
use super::validation::{self, Limits};
use crate::error::RoomError;
use crate::store::RoomStore;

/// Number of per-room lock stripes. Rooms hashing to the same stripe
/// serialize against each other; distinct stripes run in parallel.
const LOCK_STRIPES: usize = 64;

/// What a leave did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The room did not exist.
    Absent,
    /// The room is still live with this many connections.
    Remaining(usize),
    /// The leaving connection was the last one; the room is gone.
    Purged,
}

/// Authoritative room lifecycle: create, join, post, leave, close.
///
/// Every operation on a room id runs under that id's lock stripe for its
/// whole read-modify-write, including the store round trip, so a leave that
/// empties a room and a concurrent join or post can never interleave.
pub struct RoomEngine {
    store: Arc<dyn RoomStore>,
    observer: Option<Arc<dyn RoomObserver>>,
    limits: Limits,
    locks: Vec<Mutex<()>>,
    hasher: RandomState,
}

impl RoomEngine {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        Self {
            store,
            observer: None,
            limits: Limits::default(),
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            hasher: RandomState::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RoomObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    fn lock_for(&self, room_id: &str) -> &Mutex<()> {
        let idx = (self.hasher.hash_one(room_id) as usize) % self.locks.len();
        &self.locks[idx]
    }

    fn notify(&self, room_id: &str, event: &RoomEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(room_id, event);
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Create a room if it does not exist. Creating a live room is a no-op
    /// and never resets its content.
    pub async fn create_room(&self, room_id: &str) -> Result<(), RoomError> {
        let _guard = self.lock_for(room_id).lock().await;

        if self.store.get(room_id).await?.is_some() {
            debug!(%room_id, "create on live room ignored");
            return Ok(());
        }

        let room = self.store.create(room_id).await?;
        info!(%room_id, "room created");
        self.notify(room_id, &RoomEvent::update(&room));
        Ok(())
    }

    /// Register a connection in a live room. Returns the active count after
    /// the join. Joining never creates a room.
    pub async fn join_room(
        &self,
        room_id: &str,
        connection_id: &ConnectionId,
    ) -> Result<usize, RoomError> {
        let _guard = self.lock_for(room_id).lock().await;

        let mut room = self
            .store
            .get(room_id)
            .await?
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;

        if room.members.join(connection_id.clone()) {
            self.store.update(&room).await?;
            debug!(%room_id, active_users = room.active_users(), "connection joined");
            self.notify(room_id, &RoomEvent::update(&room));
        }

        Ok(room.active_users())
    }

    /// Remove a connection. If that leaves the room empty, the room is
    /// purged before this returns. Leaving an absent room, or a room the
    /// connection is not in, changes nothing.
    pub async fn leave_room(
        &self,
        room_id: &str,
        connection_id: &ConnectionId,
    ) -> Result<LeaveOutcome, RoomError> {
        let _guard = self.lock_for(room_id).lock().await;

        let Some(mut room) = self.store.get(room_id).await? else {
            return Ok(LeaveOutcome::Absent);
        };

        if !room.members.leave(connection_id) {
            return Ok(LeaveOutcome::Remaining(room.active_users()));
        }

        if room.active_users() == 0 {
            self.store.delete(room_id).await?;
            info!(%room_id, "room purged: last participant left");
            self.notify(
                room_id,
                &RoomEvent::Closed {
                    reason: CloseReason::Empty,
                },
            );
            return Ok(LeaveOutcome::Purged);
        }

        self.store.update(&room).await?;
        debug!(%room_id, active_users = room.active_users(), "connection left");
        self.notify(room_id, &RoomEvent::update(&room));
        Ok(LeaveOutcome::Remaining(room.active_users()))
    }

    /// Append a message to a live room. Input is validated before the room
    /// is looked up; posting never creates a room.
    pub async fn post_message(
        &self,
        room_id: &str,
        username: &str,
        text: &str,
    ) -> Result<Message, RoomError> {
        validation::validate_username(username, self.limits.max_username_length)
            .map_err(RoomError::Validation)?;
        validation::validate_text(text, self.limits.max_message_length)
            .map_err(RoomError::Validation)?;

        let _guard = self.lock_for(room_id).lock().await;

        let mut room = self
            .store
            .get(room_id)
            .await?
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;

        let message = Message::new(username.trim().to_string(), text.trim().to_string());
        room.messages.append(message.clone());
        self.store.update(&room).await?;

        self.notify(room_id, &RoomEvent::update(&room));
        Ok(message)
    }

    /// Purge a room regardless of who is still in it. Returns whether a
    /// room was removed.
    pub async fn close_room(&self, room_id: &str) -> Result<bool, RoomError> {
        let _guard = self.lock_for(room_id).lock().await;

        let Some(room) = self.store.get(room_id).await? else {
            return Ok(false);
        };

        self.store.delete(room_id).await?;
        info!(
            %room_id,
            active_users = room.active_users(),
            "room purged: closed by host"
        );
        self.notify(
            room_id,
            &RoomEvent::Closed {
                reason: CloseReason::Host,
            },
        );
        Ok(true)
    }

    /// Current view of a room. An absent room yields an empty snapshot with
    /// `exists == false`, never an error.
    pub async fn snapshot(&self, room_id: &str) -> Result<RoomSnapshot, RoomError> {
        let _guard = self.lock_for(room_id).lock().await;

        Ok(self
            .store
            .get(room_id)
            .await?
            .map(|room| RoomSnapshot::from(&room))
            .unwrap_or_else(RoomSnapshot::absent))
    }

    // ── Startup ─────────────────────────────────────────────────────

    /// Delete every room left in the store. Run once at startup: no
    /// connection outlives the process, so any stored room is orphaned.
    pub async fn purge_orphaned_rooms(&self) -> Result<usize, RoomError> {
        let room_ids = self.store.room_ids().await?;
        let mut purged = 0;

        for room_id in &room_ids {
            let _guard = self.lock_for(room_id).lock().await;
            if let Err(e) = self.store.delete(room_id).await {
                warn!(%room_id, error = %e, "failed to purge orphaned room");
                return Err(e.into());
            }
            purged += 1;
        }

        if purged > 0 {
            info!(count = purged, "purged orphaned rooms from store");
        }
        Ok(purged)
    }
}
