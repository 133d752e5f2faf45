//! Search API endpoints
//!
//! Read-only views over the notes corpus. All listings are served through
//! the query cache, same as `/api/notes`.

use axum::Router;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;

use super::notes::types::{PageQuery, SearchQuery};
use super::notes::{NotesApiState, list_languages, serve_page};
use crate::api::extractors::{LanguagePath, UserPath, ValidatedQuery};
use crate::api::types::{ApiError, PaginatedResponse};
use crate::data::query_cache::{QueryParams, RequesterScope};
use crate::data::types::Visibility;

/// Build Search API routes
pub fn routes(state: NotesApiState) -> Router<()> {
    Router::new()
        .route("/notes", get(search_public))
        .route("/notes/public", get(public_notes))
        .route("/notes/user/{userId}", get(search_user))
        .route("/notes/user/{userId}/all", get(user_notes))
        .route("/notes/language/{language}", get(notes_by_language))
        .route("/languages", get(list_languages))
        .with_state(state)
}

fn search_params(scope: RequesterScope, query: &SearchQuery) -> QueryParams {
    let mut params = QueryParams::new(scope);
    params.text = query.query.clone();
    params.visibility = query.visibility;
    params.language = query.language.clone();
    params.page = query.page;
    params.size = query.size;
    params
}

fn page_params(scope: RequesterScope, query: &PageQuery) -> QueryParams {
    let mut params = QueryParams::new(scope);
    params.page = query.page;
    params.size = query.size;
    params
}

/// Search public notes
#[utoipa::path(
    get,
    path = "/api/search/notes",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Page of matching public notes", body = PaginatedResponse<super::notes::types::NoteDto>)
    )
)]
pub async fn search_public(
    State(state): State<NotesApiState>,
    query: ValidatedQuery<SearchQuery>,
) -> Result<Response, ApiError> {
    serve_page(
        &state.notes,
        search_params(RequesterScope::Anonymous, &query),
    )
    .await
}

/// Search one user's notes
#[utoipa::path(
    get,
    path = "/api/search/notes/user/{userId}",
    tag = "search",
    params(("userId" = String, Path, description = "Owner ID"), SearchQuery),
    responses(
        (status = 200, description = "Page of the user's matching notes", body = PaginatedResponse<super::notes::types::NoteDto>)
    )
)]
pub async fn search_user(
    State(state): State<NotesApiState>,
    path: UserPath,
    query: ValidatedQuery<SearchQuery>,
) -> Result<Response, ApiError> {
    serve_page(
        &state.notes,
        search_params(RequesterScope::Owner(path.user_id), &query),
    )
    .await
}

/// Public notes, newest first
#[utoipa::path(
    get,
    path = "/api/search/notes/public",
    tag = "search",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of public notes", body = PaginatedResponse<super::notes::types::NoteDto>)
    )
)]
pub async fn public_notes(
    State(state): State<NotesApiState>,
    query: ValidatedQuery<PageQuery>,
) -> Result<Response, ApiError> {
    let mut params = page_params(RequesterScope::Anonymous, &query);
    params.visibility = Some(Visibility::Public);
    serve_page(&state.notes, params).await
}

/// All of one user's notes, any visibility
#[utoipa::path(
    get,
    path = "/api/search/notes/user/{userId}/all",
    tag = "search",
    params(("userId" = String, Path, description = "Owner ID"), PageQuery),
    responses(
        (status = 200, description = "Page of the user's notes", body = PaginatedResponse<super::notes::types::NoteDto>)
    )
)]
pub async fn user_notes(
    State(state): State<NotesApiState>,
    path: UserPath,
    query: ValidatedQuery<PageQuery>,
) -> Result<Response, ApiError> {
    serve_page(
        &state.notes,
        page_params(RequesterScope::Owner(path.user_id), &query),
    )
    .await
}

/// Public notes in one language
#[utoipa::path(
    get,
    path = "/api/search/notes/language/{language}",
    tag = "search",
    params(("language" = String, Path, description = "Code language"), PageQuery),
    responses(
        (status = 200, description = "Page of public notes in the language", body = PaginatedResponse<super::notes::types::NoteDto>)
    )
)]
pub async fn notes_by_language(
    State(state): State<NotesApiState>,
    path: LanguagePath,
    query: ValidatedQuery<PageQuery>,
) -> Result<Response, ApiError> {
    let mut params = page_params(RequesterScope::Anonymous, &query);
    params.language = Some(path.language);
    serve_page(&state.notes, params).await
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::routes::notes::CACHE_STATUS_HEADER;
    use crate::api::testing::{ALICE, BOB, send, test_router};

    async fn create(router: &axum::Router, user: &str, visibility: &str, language: &str) {
        let (status, _, _) = send(
            router,
            Method::POST,
            "/api/notes",
            Some(json!({
                "userId": user,
                "title": "Pattern matching",
                "content": "match arms",
                "visibility": visibility,
                "codeLanguage": language
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_user_search_sees_private_notes() {
        let router = test_router().await;
        create(&router, ALICE, "PRIVATE", "rust").await;
        create(&router, BOB, "PUBLIC", "rust").await;

        let (status, _, page) = send(
            &router,
            Method::GET,
            &format!("/api/search/notes/user/{ALICE}?query=match"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["meta"]["totalItems"], 1);
        assert_eq!(page["data"][0]["visibility"], "PRIVATE");

        let (_, _, page) = send(&router, Method::GET, "/api/search/notes?query=match", None).await;
        assert_eq!(page["meta"]["totalItems"], 1);
        assert_eq!(page["data"][0]["userId"], BOB);
    }

    #[tokio::test]
    async fn test_language_listing_invalidated_by_language_change() {
        let router = test_router().await;
        create(&router, ALICE, "PUBLIC", "go").await;

        let uri = "/api/search/notes/language/rust";
        let (_, headers, page) = send(&router, Method::GET, uri, None).await;
        assert_eq!(headers[CACHE_STATUS_HEADER], "MISS");
        assert_eq!(page["meta"]["totalItems"], 0);

        create(&router, BOB, "PUBLIC", "rust").await;
        let (_, headers, page) = send(&router, Method::GET, uri, None).await;
        assert_eq!(headers[CACHE_STATUS_HEADER], "STALE");
        assert_eq!(page["meta"]["totalItems"], 1);
    }

    #[tokio::test]
    async fn test_public_and_user_all_listings() {
        let router = test_router().await;
        create(&router, ALICE, "PRIVATE", "rust").await;
        create(&router, ALICE, "PUBLIC", "rust").await;

        let (_, _, page) = send(&router, Method::GET, "/api/search/notes/public", None).await;
        assert_eq!(page["meta"]["totalItems"], 1);

        let (_, _, page) = send(
            &router,
            Method::GET,
            &format!("/api/search/notes/user/{ALICE}/all?size=1"),
            None,
        )
        .await;
        assert_eq!(page["meta"]["totalItems"], 2);
        assert_eq!(page["meta"]["totalPages"], 2);
        assert_eq!(page["meta"]["size"], 1);
    }

    #[tokio::test]
    async fn test_invalid_user_path_rejected() {
        let router = test_router().await;
        let (status, _, body) = send(
            &router,
            Method::GET,
            "/api/search/notes/user/nobody/all",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_USER_ID");
    }

    #[tokio::test]
    async fn test_search_languages() {
        let router = test_router().await;
        create(&router, ALICE, "PUBLIC", "rust").await;
        create(&router, BOB, "PRIVATE", "go").await;

        let (status, _, body) = send(&router, Method::GET, "/api/search/languages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["go", "rust"]));
    }
}
