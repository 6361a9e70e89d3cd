use std::sync::Arc;
use std::time::Duration;

use crate::engine::notifier::RoomBroadcaster;
use crate::engine::room_engine::RoomEngine;

use super::rate_limit::ApiRateLimiters;

/// Shortest keep-alive interval an event stream will use.
pub const MIN_HEARTBEAT: Duration = Duration::from_secs(1);

/// Shared state handed to every HTTP handler.
pub struct AppState {
    pub engine: Arc<RoomEngine>,
    /// The same broadcaster the engine notifies; event streams subscribe here.
    pub broadcaster: Arc<RoomBroadcaster>,
    pub rate_limiters: Arc<ApiRateLimiters>,
    pub heartbeat: Duration,
}

impl AppState {
    /// Wire an engine to a fresh broadcaster. `heartbeat` is raised to
    /// `MIN_HEARTBEAT` if shorter.
    pub fn new(engine: RoomEngine, heartbeat: Duration) -> Self {
        let broadcaster = Arc::new(RoomBroadcaster::default());
        let engine = engine.with_observer(broadcaster.clone());
        Self {
            engine: Arc::new(engine),
            broadcaster,
            rate_limiters: Arc::new(ApiRateLimiters::default()),
            heartbeat: heartbeat.max(MIN_HEARTBEAT),
        }
    }
}
