//! Admission middleware for API routes

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::core::constants::RATE_LIMIT_BYPASS_HEADER;
use crate::data::cache::{AdmissionDecision, RateLimiter};
use crate::utils::crypto::constant_time_eq;

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// Rate limit middleware state
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub bypass_header: Option<String>,
}

/// Rate limit exceeded response
pub struct RateLimitExceeded(AdmissionDecision);

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let decision = &self.0;
        let retry_after = decision.retry_after.unwrap_or(1);

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "too_many_requests",
                "code": "RATE_LIMITED",
                "message": format!("Rate limit exceeded, retry in {} seconds", retry_after)
            })),
        )
            .into_response();

        let headers = response.headers_mut();
        add_rate_limit_headers(headers, decision);
        headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        response
    }
}

/// Add rate limit headers to response
fn add_rate_limit_headers(headers: &mut HeaderMap, decision: &AdmissionDecision) {
    headers.insert(HEADER_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(HEADER_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(HEADER_RESET, HeaderValue::from(decision.reset_at));
}

/// Client id: first `X-Forwarded-For` entry when present, else the peer IP
fn client_id(request: &Request, addr: SocketAddr) -> String {
    request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| addr.ip().to_string())
}

/// Rate limiting middleware function
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitExceeded> {
    // Check bypass header (for internal services)
    if let Some(ref bypass_secret) = state.bypass_header
        && let Some(header_val) = request.headers().get(RATE_LIMIT_BYPASS_HEADER)
        && header_val
            .to_str()
            .is_ok_and(|value| constant_time_eq(value, bypass_secret))
    {
        tracing::trace!("Rate limit bypassed via header");
        return Ok(next.run(request).await);
    }

    let client_id = client_id(&request, addr);
    let decision = state.limiter.allow(&client_id).await;

    if !decision.permitted {
        tracing::debug!(%client_id, limit = decision.limit, "Rate limit exceeded");
        return Err(RateLimitExceeded(decision));
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(response.headers_mut(), &decision);
    Ok(response)
}
