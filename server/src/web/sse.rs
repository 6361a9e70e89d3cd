use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderName;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::stream;
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error};

use crate::engine::events::{RoomEvent, RoomSnapshot};
use crate::engine::notifier::RoomBroadcaster;
use crate::engine::room::ConnectionId;
use crate::engine::room_engine::RoomEngine;

use super::app_state::AppState;
use super::rest_api::room_error_response;

/// A stream's seat in a room. Dropping it (client went away, or the stream
/// ended) leaves the room exactly once.
struct Membership {
    engine: Arc<RoomEngine>,
    broadcaster: Arc<RoomBroadcaster>,
    room_id: String,
    connection_id: ConnectionId,
}

impl Drop for Membership {
    fn drop(&mut self) {
        let engine = self.engine.clone();
        let broadcaster = self.broadcaster.clone();
        let room_id = std::mem::take(&mut self.room_id);
        let connection_id = self.connection_id.clone();

        tokio::spawn(async move {
            match engine.leave_room(&room_id, &connection_id).await {
                Ok(outcome) => debug!(%room_id, %connection_id, ?outcome, "event stream left room"),
                Err(e) => error!(%room_id, %connection_id, error = %e, "failed to leave room"),
            }
            broadcaster.prune(&room_id);
        });
    }
}

struct StreamState {
    // Declared before `membership` so the receiver is gone by the time the
    // leave task prunes the channel.
    rx: broadcast::Receiver<RoomEvent>,
    pending: Option<Event>,
    finished: bool,
    membership: Membership,
}

fn init_event(snapshot: &RoomSnapshot) -> Result<Event, axum::Error> {
    Event::default().json_data(json!({
        "type": "init",
        "messages": snapshot.messages,
        "activeUsers": snapshot.active_users,
    }))
}

/// GET /api/room/{id}/events: join the room under a fresh connection id and
/// push its state until the client disconnects or the room closes.
pub async fn room_events(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Response {
    let connection_id = ConnectionId::generate();

    // Subscribe first: a close that lands between join and subscribe would
    // otherwise never reach this stream.
    let rx = state.broadcaster.subscribe(&room_id);

    if let Err(e) = state.engine.join_room(&room_id, &connection_id).await {
        drop(rx);
        state.broadcaster.prune(&room_id);
        return room_error_response(e);
    }

    let membership = Membership {
        engine: state.engine.clone(),
        broadcaster: state.broadcaster.clone(),
        room_id: room_id.clone(),
        connection_id,
    };

    let snapshot = match state.engine.snapshot(&room_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => return room_error_response(e),
    };
    let initial = match init_event(&snapshot) {
        Ok(event) => event,
        Err(e) => {
            error!(%room_id, error = %e, "failed to encode initial snapshot");
            return axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    debug!(%room_id, connection_id = %membership.connection_id, "event stream opened");

    let events = stream::unfold(
        StreamState {
            rx,
            pending: Some(initial),
            finished: false,
            membership,
        },
        |mut st| async move {
            if let Some(event) = st.pending.take() {
                return Some((Ok::<_, axum::Error>(event), st));
            }
            if st.finished {
                return None;
            }
            loop {
                match st.rx.recv().await {
                    Ok(event) => {
                        st.finished = event.is_closed();
                        let frame = Event::default().json_data(&event);
                        return Some((frame, st));
                    }
                    // Every update carries full state, so skipping is safe.
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(room_id = %st.membership.room_id, skipped, "event stream lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        },
    );

    let sse = Sse::new(events).keep_alive(KeepAlive::new().interval(state.heartbeat));

    // Keep nginx-style reverse proxies from buffering the stream.
    ([(HeaderName::from_static("x-accel-buffering"), "no")], sse).into_response()
}
