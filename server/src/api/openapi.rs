//! OpenAPI specification and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{health, notes, search};
use crate::api::types::PaginationMeta;
use crate::data::types::Visibility;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scrib API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Notes service with shared admission control and coherent query caching"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "notes", description = "Note management and listing"),
        (name = "search", description = "Read-only note search")
    ),
    paths(
        // Health
        health::health,
        // Notes
        notes::create_note,
        notes::update_note,
        notes::delete_note,
        notes::get_note,
        notes::list_notes,
        notes::search_notes,
        notes::list_languages,
        // Search
        search::search_public,
        search::search_user,
        search::public_notes,
        search::user_notes,
        search::notes_by_language,
    ),
    components(schemas(
        // API types
        PaginationMeta,
        Visibility,
        // Health
        health::HealthResponse,
        health::StoreHealth,
        // Notes
        notes::types::NoteDto,
        notes::types::NoteRequest,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Scrib API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout",
                deepLinking: true,
                showExtensions: true,
                showCommonExtensions: true
            });
        };
    </script>
</body>
</html>"#;
