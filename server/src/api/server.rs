//! API server initialization

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::middleware;
use super::openapi::{openapi_json, swagger_ui_html};
use super::rate_limit::{RateLimitState, rate_limit_middleware};
use super::routes::notes::NotesApiState;
use super::routes::{health, notes, search};
use crate::core::CoreApp;
use crate::core::constants::DEFAULT_BODY_LIMIT;

pub struct ApiServer {
    app: CoreApp,
}

/// Build the full router for `app`
///
/// Every `/api` route sits behind admission control when it is enabled.
pub fn router(app: &CoreApp) -> Router {
    let notes_state = NotesApiState {
        notes: app.notes.clone(),
    };

    let api = Router::new()
        .route("/health", get(health::health).with_state(app.cache.clone()))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui_html))
        .nest("/notes", notes::routes(app.notes.clone()))
        .nest("/search", search::routes(notes_state));

    let api = if app.config.rate_limit.enabled {
        api.layer(axum::middleware::from_fn_with_state(
            RateLimitState {
                limiter: app.rate_limiter.clone(),
                bypass_header: app.config.rate_limit.bypass_header.clone(),
            },
            rate_limit_middleware,
        ))
    } else {
        tracing::debug!("Rate limiting disabled by config");
        api
    };

    Router::new()
        .nest("/api", api)
        .fallback(middleware::handle_404)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(middleware::cors())
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        // Clone shutdown before moving app
        let shutdown = app.shutdown.clone();

        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let addr = SocketAddr::new(host.parse()?, port);

        let router = router(&app);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "Listening");
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}
