use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::engine::room::ConnectionId;
use crate::engine::room_engine::LeaveOutcome;
use crate::engine::validation;
use crate::error::RoomError;

use super::app_state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map an engine error to an HTTP response. A store failure is a 500, never
/// a 404: clients treat 404 as "this room has closed".
pub fn room_error_response(err: RoomError) -> Response {
    match err {
        RoomError::RoomNotFound(_) => error_response(StatusCode::NOT_FOUND, "Room not found"),
        RoomError::Validation(reason) => error_response(StatusCode::BAD_REQUEST, reason),
        RoomError::Store(e) => {
            error!(error = %e, "room store failure");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Storage unavailable")
        }
    }
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

// ── Room endpoints ──────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub id: String,
    pub name: String,
}

/// POST /api/room: create a room with a fresh id. The display name is
/// echoed back for the client's URL and is not stored.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRoomRequest>,
) -> Response {
    if let Err(e) = validation::validate_room_name(&body.name) {
        return error_response(StatusCode::BAD_REQUEST, e);
    }

    let id = Uuid::new_v4().to_string();
    match state.engine.create_room(&id).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(CreateRoomResponse {
                id,
                name: body.name.trim().to_string(),
            }),
        )
            .into_response(),
        Err(e) => room_error_response(e),
    }
}

/// GET /api/room/{id}: snapshot; an absent room is a 200 with `exists: false`.
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Response {
    match state.engine.snapshot(&room_id).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => room_error_response(e),
    }
}

#[derive(Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub text: String,
}

/// POST /api/room/{id}: post a message.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> Response {
    match state
        .engine
        .post_message(&room_id, &body.username, &body.text)
        .await
    {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(e) => room_error_response(e),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipAction {
    Join,
    Leave,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRequest {
    pub action: MembershipAction,
    pub connection_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub active_users: usize,
    pub exists: bool,
}

/// PUT /api/room/{id}: join or leave on behalf of a polling client, which
/// supplies its own connection id.
pub async fn update_membership(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(body): Json<MembershipRequest>,
) -> Response {
    if body.connection_id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "connectionId required");
    }
    let connection_id = ConnectionId::from(body.connection_id);

    let result = match body.action {
        MembershipAction::Join => state
            .engine
            .join_room(&room_id, &connection_id)
            .await
            .map(|active_users| MembershipResponse {
                active_users,
                exists: true,
            }),
        MembershipAction::Leave => state
            .engine
            .leave_room(&room_id, &connection_id)
            .await
            .map(|outcome| match outcome {
                LeaveOutcome::Remaining(active_users) => MembershipResponse {
                    active_users,
                    exists: true,
                },
                LeaveOutcome::Absent | LeaveOutcome::Purged => MembershipResponse {
                    active_users: 0,
                    exists: false,
                },
            }),
    };

    match result {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => room_error_response(e),
    }
}

/// DELETE /api/room/{id}: host teardown, regardless of who is still connected.
pub async fn close_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Response {
    match state.engine.close_room(&room_id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => room_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_membership_request_parses_camel_case() {
        let json = r#"{"action": "join", "connectionId": "tab-1"}"#;
        let req: MembershipRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.action, MembershipAction::Join);
        assert_eq!(req.connection_id, "tab-1");
    }

    #[test]
    fn test_membership_request_unknown_action_fails() {
        let json = r#"{"action": "kick", "connectionId": "tab-1"}"#;
        assert!(serde_json::from_str::<MembershipRequest>(json).is_err());
    }

    #[test]
    fn test_post_message_request_missing_fields_default_empty() {
        let req: PostMessageRequest = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert!(req.username.is_empty());
        assert_eq!(req.text, "hi");
    }

    #[test]
    fn test_create_room_request_missing_name_fails() {
        assert!(serde_json::from_str::<CreateRoomRequest>("{}").is_err());
    }

    #[test]
    fn test_membership_response_serializes_camel_case() {
        let json = serde_json::to_value(MembershipResponse {
            active_users: 3,
            exists: true,
        })
        .unwrap();
        assert_eq!(json["activeUsers"], 3);
        assert_eq!(json["exists"], true);
    }

    #[test]
    fn test_error_status_mapping() {
        let not_found = room_error_response(RoomError::RoomNotFound("r".into()));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid = room_error_response(RoomError::Validation("bad".into()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let store = room_error_response(RoomError::Store(StoreError::Database(
            sqlx::Error::PoolClosed,
        )));
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
