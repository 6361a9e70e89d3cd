use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::rate_limiter::RateLimiter;

/// Per-IP rate limiters for the room API.
pub struct ApiRateLimiters {
    /// Room create/read/post/membership calls.
    /// Burst of 60, refill 1 per second (~60/minute sustained).
    pub api: RateLimiter,
    /// Event stream connections: prevent reconnect storms.
    /// Burst of 5, refill 1 per 12 seconds (~5/minute).
    pub stream: RateLimiter,
}

impl Default for ApiRateLimiters {
    fn default() -> Self {
        Self {
            api: RateLimiter::new(60, 1.0),
            stream: RateLimiter::new(5, 12.0),
        }
    }
}

impl ApiRateLimiters {
    /// Drop buckets for clients idle longer than `older_than`.
    pub fn cleanup(&self, older_than: Duration) {
        self.api.cleanup(older_than);
        self.stream.cleanup(older_than);
    }
}

/// Client IP for rate limiting. Proxy headers are only trusted when the
/// direct peer is loopback (a local reverse proxy); otherwise a client could
/// spoof them to dodge its limit.
fn client_ip(req: &Request<Body>) -> String {
    let peer_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip());
    let from_loopback = peer_ip.is_some_and(|ip| ip.is_loopback());

    if from_loopback {
        if let Some(forwarded) = req.headers().get("x-forwarded-for")
            && let Ok(val) = forwarded.to_str()
            && let Some(first) = val.split(',').next()
        {
            return first.trim().to_string();
        }

        if let Some(real_ip) = req.headers().get("x-real-ip")
            && let Ok(val) = real_ip.to_str()
        {
            return val.trim().to_string();
        }
    }

    peer_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn limited(
    req: &Request<Body>,
    pick: impl FnOnce(&ApiRateLimiters) -> &RateLimiter,
) -> bool {
    req.extensions()
        .get::<Arc<ApiRateLimiters>>()
        .is_some_and(|limiters| !pick(limiters).check(&client_ip(req)))
}

/// Middleware for general room API rate limiting.
pub async fn api_rate_limit(req: Request<Body>, next: Next) -> Response {
    if limited(&req, |l| &l.api) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again later.",
        )
            .into_response();
    }
    next.run(req).await
}

/// Middleware for event stream connection rate limiting.
pub async fn stream_rate_limit(req: Request<Body>, next: Next) -> Response {
    if limited(&req, |l| &l.stream) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many connections. Please try again later.",
        )
            .into_response();
    }
    next.run(req).await
}
