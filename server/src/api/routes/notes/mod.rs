//! Notes API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use types::{ListQuery, NoteDto, NoteRequest, OwnerQuery, SearchQuery, ViewerQuery};

use crate::api::extractors::{NotePath, ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, PaginatedResponse};
use crate::data::query_cache::{QueryOutcome, QueryParams, RequesterScope};
use crate::data::types::{NewNote, NoteUpdate};
use crate::domain::NoteService;

/// Response header reporting how a listing was served
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Shared state for note and search endpoints
#[derive(Clone)]
pub struct NotesApiState {
    pub notes: Arc<NoteService>,
}

/// Build Notes API routes
pub fn routes(notes: Arc<NoteService>) -> Router<()> {
    let state = NotesApiState { notes };

    Router::new()
        .route("/", get(list_notes).post(create_note))
        .route("/search", get(search_notes))
        .route("/languages", get(list_languages))
        .route("/{id}", get(get_note).put(update_note).delete(delete_note))
        .with_state(state)
}

/// Paginated listing response with its cache status
pub(crate) fn page_response(outcome: &QueryOutcome) -> Response {
    let entry = &outcome.entry;
    let data = entry
        .page
        .records
        .iter()
        .cloned()
        .map(NoteDto::from)
        .collect();
    (
        [(CACHE_STATUS_HEADER, outcome.status.as_str())],
        Json(PaginatedResponse::new(
            data,
            entry.key.page,
            entry.key.size,
            entry.page.total,
        )),
    )
        .into_response()
}

/// Canonicalize, query through the cache and render one page
pub(crate) async fn serve_page(
    notes: &NoteService,
    params: QueryParams,
) -> Result<Response, ApiError> {
    let key = notes.key(params).map_err(ApiError::from_query_key)?;
    let outcome = notes.query(key).await.map_err(ApiError::from_data)?;
    Ok(page_response(&outcome))
}

fn scope_for(user_id: Option<&String>) -> RequesterScope {
    match user_id {
        Some(user_id) => RequesterScope::Owner(user_id.clone()),
        None => RequesterScope::Anonymous,
    }
}

fn normalize_language(language: &Option<String>) -> Option<String> {
    language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

/// Create a note
#[utoipa::path(
    post,
    path = "/api/notes",
    tag = "notes",
    request_body = NoteRequest,
    responses(
        (status = 201, description = "Note created", body = NoteDto),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_note(
    State(state): State<NotesApiState>,
    ValidatedJson(body): ValidatedJson<NoteRequest>,
) -> Result<(StatusCode, Json<NoteDto>), ApiError> {
    let new = NewNote {
        owner_id: body.user_id.clone(),
        title: body.title.clone(),
        content: body.content.clone(),
        visibility: body.visibility,
        language: normalize_language(&body.code_language),
    };
    let note = state.notes.create(&new).await.map_err(ApiError::from_data)?;
    Ok((StatusCode::CREATED, Json(note.into())))
}

/// Replace a note's fields (owner only)
#[utoipa::path(
    put,
    path = "/api/notes/{id}",
    tag = "notes",
    params(("id" = String, Path, description = "Note ID")),
    request_body = NoteRequest,
    responses(
        (status = 200, description = "Note updated", body = NoteDto),
        (status = 403, description = "Note belongs to another user"),
        (status = 404, description = "Note not found")
    )
)]
pub async fn update_note(
    State(state): State<NotesApiState>,
    path: NotePath,
    ValidatedJson(body): ValidatedJson<NoteRequest>,
) -> Result<Json<NoteDto>, ApiError> {
    let update = NoteUpdate {
        owner_id: body.user_id.clone(),
        title: body.title.clone(),
        content: body.content.clone(),
        visibility: body.visibility,
        language: normalize_language(&body.code_language),
    };
    let note = state
        .notes
        .update(&path.id, &update)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(note.into()))
}

/// Soft-delete a note (owner only)
#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    tag = "notes",
    params(("id" = String, Path, description = "Note ID"), OwnerQuery),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 403, description = "Note belongs to another user"),
        (status = 404, description = "Note not found")
    )
)]
pub async fn delete_note(
    State(state): State<NotesApiState>,
    path: NotePath,
    query: ValidatedQuery<OwnerQuery>,
) -> Result<StatusCode, ApiError> {
    state
        .notes
        .delete(&path.id, &query.user_id)
        .await
        .map_err(ApiError::from_data)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get a note visible to the requester
#[utoipa::path(
    get,
    path = "/api/notes/{id}",
    tag = "notes",
    params(("id" = String, Path, description = "Note ID"), ViewerQuery),
    responses(
        (status = 200, description = "Note", body = NoteDto),
        (status = 404, description = "Note not found or not visible")
    )
)]
pub async fn get_note(
    State(state): State<NotesApiState>,
    path: NotePath,
    query: ValidatedQuery<ViewerQuery>,
) -> Result<Json<NoteDto>, ApiError> {
    let note = state
        .notes
        .get(&path.id, query.user_id.as_deref())
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(note.into()))
}

/// List a user's notes, or public notes when no user is given
#[utoipa::path(
    get,
    path = "/api/notes",
    tag = "notes",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of notes", body = PaginatedResponse<NoteDto>)
    )
)]
pub async fn list_notes(
    State(state): State<NotesApiState>,
    query: ValidatedQuery<ListQuery>,
) -> Result<Response, ApiError> {
    let mut params = QueryParams::new(scope_for(query.user_id.as_ref()));
    params.page = query.page;
    params.size = query.size;
    serve_page(&state.notes, params).await
}

/// Search notes by text, visibility and language
#[utoipa::path(
    get,
    path = "/api/notes/search",
    tag = "notes",
    params(SearchQuery),
    responses(
        (status = 200, description = "Page of matching notes", body = PaginatedResponse<NoteDto>),
        (status = 400, description = "Invalid search parameters")
    )
)]
pub async fn search_notes(
    State(state): State<NotesApiState>,
    query: ValidatedQuery<SearchQuery>,
) -> Result<Response, ApiError> {
    let mut params = QueryParams::new(scope_for(query.user_id.as_ref()));
    params.text = query.query.clone();
    params.visibility = query.visibility;
    params.language = query.language.clone();
    params.page = query.page;
    params.size = query.size;
    serve_page(&state.notes, params).await
}

/// Distinct languages in use
#[utoipa::path(
    get,
    path = "/api/notes/languages",
    tag = "notes",
    responses(
        (status = 200, description = "Sorted language list", body = Vec<String>)
    )
)]
pub async fn list_languages(
    State(state): State<NotesApiState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let languages = state
        .notes
        .languages()
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(languages))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::api::testing::{ALICE, BOB, send, test_router};

    use super::*;

    fn note_body(user: &str, visibility: &str) -> Value {
        json!({
            "userId": user,
            "title": "Ownership",
            "content": "Moves and borrows",
            "visibility": visibility,
            "codeLanguage": "rust"
        })
    }

    #[tokio::test]
    async fn test_create_and_get_note() {
        let router = test_router().await;

        let (status, _, created) =
            send(&router, Method::POST, "/api/notes", Some(note_body(ALICE, "PRIVATE"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["userId"], ALICE);
        assert_eq!(created["codeLanguage"], "rust");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _, note) = send(
            &router,
            Method::GET,
            &format!("/api/notes/{id}?userId={ALICE}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(note["title"], "Ownership");

        // Private notes are invisible to anyone else
        let (status, _, _) = send(
            &router,
            Method::GET,
            &format!("/api/notes/{id}?userId={BOB}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_public_listing_sees_visibility_change() {
        let router = test_router().await;
        let (_, _, created) =
            send(&router, Method::POST, "/api/notes", Some(note_body(ALICE, "PRIVATE"))).await;
        let id = created["id"].as_str().unwrap().to_string();

        let (_, headers, page) = send(&router, Method::GET, "/api/notes", None).await;
        assert_eq!(headers[CACHE_STATUS_HEADER], "MISS");
        assert_eq!(page["meta"]["totalItems"], 0);

        let (_, headers, _) = send(&router, Method::GET, "/api/notes", None).await;
        assert_eq!(headers[CACHE_STATUS_HEADER], "HIT");

        let (status, _, _) = send(
            &router,
            Method::PUT,
            &format!("/api/notes/{id}"),
            Some(note_body(ALICE, "PUBLIC")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, headers, page) = send(&router, Method::GET, "/api/notes", None).await;
        assert_eq!(headers[CACHE_STATUS_HEADER], "STALE");
        assert_eq!(page["data"][0]["id"], id.as_str());
        assert_eq!(page["meta"]["totalItems"], 1);
        assert_eq!(page["meta"]["totalPages"], 1);
    }

    #[tokio::test]
    async fn test_update_by_other_user_is_forbidden() {
        let router = test_router().await;
        let (_, _, created) =
            send(&router, Method::POST, "/api/notes", Some(note_body(ALICE, "PUBLIC"))).await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _, body) = send(
            &router,
            Method::PUT,
            &format!("/api/notes/{id}"),
            Some(note_body(BOB, "PUBLIC")),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCESS_DENIED");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let router = test_router().await;
        let (_, _, created) =
            send(&router, Method::POST, "/api/notes", Some(note_body(ALICE, "PUBLIC"))).await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _, _) = send(
            &router,
            Method::DELETE,
            &format!("/api/notes/{id}?userId={ALICE}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, _) =
            send(&router, Method::GET, &format!("/api/notes/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_filters_and_paginates() {
        let router = test_router().await;
        for i in 0..3 {
            let mut body = note_body(ALICE, "PUBLIC");
            body["title"] = json!(format!("Tokio tip {i}"));
            send(&router, Method::POST, "/api/notes", Some(body)).await;
        }
        let mut other = note_body(ALICE, "PUBLIC");
        other["title"] = json!("Unrelated");
        other["content"] = json!("nothing here");
        send(&router, Method::POST, "/api/notes", Some(other)).await;

        let (status, _, page) = send(
            &router,
            Method::GET,
            "/api/notes/search?query=TOKIO&page=1&size=2",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["meta"]["totalItems"], 3);
        assert_eq!(page["meta"]["page"], 1);
        assert_eq!(page["data"].as_array().unwrap().len(), 1);

        // Past the end is an empty page, not an error
        let (status, _, page) = send(
            &router,
            Method::GET,
            "/api/notes/search?query=tokio&page=9&size=2",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(page["data"].as_array().unwrap().is_empty());

        // One query covers both title and content
        let (_, _, page) = send(
            &router,
            Method::GET,
            "/api/notes/search?query=Nothing%20HERE",
            None,
        )
        .await;
        assert_eq!(page["meta"]["totalItems"], 1);
        assert_eq!(page["data"][0]["title"], "Unrelated");
    }

    #[tokio::test]
    async fn test_anonymous_private_search_rejected() {
        let router = test_router().await;
        let (status, _, body) = send(
            &router,
            Method::GET,
            "/api/notes/search?visibility=PRIVATE",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_QUERY");
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let router = test_router().await;

        let mut long_title = note_body(ALICE, "PUBLIC");
        long_title["title"] = json!("x".repeat(201));
        let (status, _, body) =
            send(&router, Method::POST, "/api/notes", Some(long_title)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _, _) = send(
            &router,
            Method::POST,
            "/api/notes",
            Some(note_body("not-a-uuid", "PUBLIC")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) = send(&router, Method::GET, "/api/notes/123", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_NOTE_ID");

        let query = "q".repeat(101);
        let (status, _, _) = send(
            &router,
            Method::GET,
            &format!("/api/notes/search?query={query}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_languages_listed() {
        let router = test_router().await;
        send(&router, Method::POST, "/api/notes", Some(note_body(ALICE, "PRIVATE"))).await;

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/notes/languages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let languages: Vec<String> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(languages, vec!["rust".to_string()]);
    }
}
