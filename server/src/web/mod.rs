pub mod app_state;
pub mod rate_limit;
pub mod rate_limiter;
pub mod rest_api;
pub mod router;
pub mod sse;
