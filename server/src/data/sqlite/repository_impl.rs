//! NoteRepository implementation for SQLite

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::traits::NoteRepository;
use crate::data::types::{NewNote, NoteChange, NoteFilter, NotePage, NoteRow, NoteUpdate};

use super::SqliteService;
use super::repositories::note;

#[async_trait]
impl NoteRepository for Arc<SqliteService> {
    async fn create_note(&self, new: &NewNote) -> Result<NoteRow, DataError> {
        note::create_note(self.pool(), new).await.map_err(Into::into)
    }

    async fn update_note(&self, id: &str, update: &NoteUpdate) -> Result<NoteChange, DataError> {
        note::update_note(self.pool(), id, update)
            .await
            .map_err(Into::into)
    }

    async fn soft_delete_note(&self, id: &str, owner_id: &str) -> Result<NoteRow, DataError> {
        note::soft_delete_note(self.pool(), id, owner_id)
            .await
            .map_err(Into::into)
    }

    async fn get_note(&self, id: &str) -> Result<Option<NoteRow>, DataError> {
        note::get_note(self.pool(), id).await.map_err(Into::into)
    }

    async fn query_notes(
        &self,
        filter: &NoteFilter,
        page: u32,
        size: u32,
    ) -> Result<NotePage, DataError> {
        note::query_notes(self.pool(), filter, page, size)
            .await
            .map_err(Into::into)
    }

    async fn list_distinct_languages(&self) -> Result<Vec<String>, DataError> {
        note::list_distinct_languages(self.pool())
            .await
            .map_err(Into::into)
    }
}
