use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use super::app_state::AppState;
use super::rate_limit::{api_rate_limit, stream_rate_limit};
use super::{rest_api, sse};

/// Request bodies are tiny JSON documents; anything larger is refused.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Build the axum router with all room routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Event streams: connection rate limit
    let stream_routes = Router::new()
        .route("/api/room/{id}/events", get(sse::room_events))
        .layer(axum::middleware::from_fn(stream_rate_limit));

    // Everything else: general rate limit
    let api_routes = Router::new()
        .route("/api/room", post(rest_api::create_room))
        .route(
            "/api/room/{id}",
            get(rest_api::get_room)
                .post(rest_api::post_message)
                .put(rest_api::update_membership)
                .delete(rest_api::close_room),
        )
        .layer(axum::middleware::from_fn(api_rate_limit));

    Router::new()
        .route("/health", get(rest_api::health))
        .merge(stream_routes)
        .merge(api_routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(axum::Extension(state.rate_limiters.clone()))
        .with_state(state)
}
