//! Shared API types
//!
//! Error responses, pagination envelope and field validators used across
//! all endpoints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidationError;

use crate::data::DataError;
use crate::data::query_cache::QueryKeyError;

/// Validator function for user and note ids
pub fn validate_uuid(id: &str) -> Result<(), ValidationError> {
    if uuid::Uuid::parse_str(id).is_err() {
        return Err(ValidationError::new("uuid").with_message("Must be a valid UUID".into()));
    }
    Ok(())
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Forbidden { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Record store errors: not-found and access-denied pass through,
    /// everything else is logged and reported generically
    pub fn from_data(e: DataError) -> Self {
        match e {
            DataError::NotFound { entity, id } => {
                Self::not_found("NOT_FOUND", format!("{} not found: {}", entity, id))
            }
            DataError::AccessDenied { entity, id } => Self::forbidden(
                "ACCESS_DENIED",
                format!("Access denied to {} {}", entity, id),
            ),
            e => {
                tracing::error!(error = %e, "Data error");
                Self::internal("Database operation failed")
            }
        }
    }

    pub fn from_query_key(e: QueryKeyError) -> Self {
        Self::bad_request("INVALID_QUERY", e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, "forbidden", code, message)
            }
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// Pagination metadata in response (zero-based page)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u32, size: u32, total_items: u64) -> Self {
        Self {
            page,
            size,
            total_items,
            total_pages: total_items.div_ceil(u64::from(size.max(1))),
        }
    }
}

/// Generic paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: u32, size: u32, total_items: u64) -> Self {
        Self {
            data,
            meta: PaginationMeta::new(page, size, total_items),
        }
    }
}
