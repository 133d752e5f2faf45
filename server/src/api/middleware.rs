//! HTTP middleware (CORS, 404 handler)

use axum::extract::Request;
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::response::IntoResponse;
use tower_http::cors::{Any, CorsLayer};

use super::rate_limit::{HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET};
use super::routes::notes::CACHE_STATUS_HEADER;

/// Create CORS layer
///
/// Any origin may call the API; it carries no cookies or credentials.
pub fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .expose_headers([
            HeaderName::from_static(HEADER_LIMIT),
            HeaderName::from_static(HEADER_REMAINING),
            HeaderName::from_static(HEADER_RESET),
            HeaderName::from_static(CACHE_STATUS_HEADER),
            header::RETRY_AFTER,
        ])
}

/// Handle 404 Not Found with logging
pub async fn handle_404(req: Request) -> impl IntoResponse {
    tracing::debug!(method = %req.method(), uri = %req.uri(), "[404]");
    StatusCode::NOT_FOUND
}
