//! Health check endpoint

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::cache::CacheService;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the shared store is unreachable
    pub status: &'static str,
    pub version: &'static str,
    pub store: StoreHealth,
}

#[derive(Serialize, ToSchema)]
pub struct StoreHealth {
    pub backend: &'static str,
    pub reachable: bool,
}

/// Health check endpoint
///
/// A store outage is reported but not fatal: admission fails open and
/// listings are served live.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(cache): State<Arc<CacheService>>) -> impl IntoResponse {
    let reachable = match cache.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Shared store health check failed");
            false
        }
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: if reachable { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            store: StoreHealth {
                backend: cache.backend_name(),
                reachable,
            },
        }),
    )
}
