//! Notes API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::types::validate_uuid;
use crate::core::constants::{MAX_LANGUAGE_LENGTH, MAX_QUERY_LENGTH, MAX_TITLE_LENGTH};
use crate::data::types::{NoteRow, Visibility};
use crate::utils::time::micros_to_datetime;

/// Note as returned by the API
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteDto {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub visibility: Visibility,
    pub code_language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NoteRow> for NoteDto {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            user_id: row.owner_id,
            title: row.title,
            content: row.content,
            visibility: row.visibility,
            code_language: row.language,
            created_at: micros_to_datetime(row.created_at),
            updated_at: micros_to_datetime(row.updated_at),
        }
    }
}

/// Create or replace a note
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    #[validate(custom(function = "validate_uuid"))]
    pub user_id: String,
    #[validate(length(min = 1, max = MAX_TITLE_LENGTH, message = "Title must be 1-200 characters"))]
    pub title: String,
    pub content: String,
    pub visibility: Visibility,
    #[validate(length(max = MAX_LANGUAGE_LENGTH, message = "Language must not exceed 50 characters"))]
    pub code_language: Option<String>,
}

/// Owner performing a mutation
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct OwnerQuery {
    #[validate(custom(function = "validate_uuid"))]
    pub user_id: String,
}

/// Optional requester identity for reads
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ViewerQuery {
    #[validate(custom(function = "validate_uuid"))]
    pub user_id: Option<String>,
}

/// Owner listing, or public listing without `userId`
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListQuery {
    #[validate(custom(function = "validate_uuid"))]
    pub user_id: Option<String>,
    /// Zero-based page index
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// Page selection only
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Zero-based page index
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// Full-text search with filters
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct SearchQuery {
    #[validate(length(max = MAX_QUERY_LENGTH, message = "Query must not exceed 100 characters"))]
    pub query: Option<String>,
    pub visibility: Option<Visibility>,
    #[validate(length(max = MAX_LANGUAGE_LENGTH, message = "Language must not exceed 50 characters"))]
    pub language: Option<String>,
    #[validate(custom(function = "validate_uuid"))]
    pub user_id: Option<String>,
    /// Zero-based page index
    pub page: Option<u32>,
    pub size: Option<u32>,
}
