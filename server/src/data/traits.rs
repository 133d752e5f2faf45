//! Record store interface
//!
//! The write path mutates through this trait and the read path queries
//! through it on cache misses. The SQLite backend implements it for
//! `Arc<SqliteService>`.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::types::{NewNote, NoteChange, NoteFilter, NotePage, NoteRow, NoteUpdate};

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a note with a generated id
    async fn create_note(&self, note: &NewNote) -> Result<NoteRow, DataError>;

    /// Replace a note's fields. `update.owner_id` must own the note.
    ///
    /// Missing or deleted notes are `NotFound`; foreign notes are `AccessDenied`.
    async fn update_note(&self, id: &str, update: &NoteUpdate) -> Result<NoteChange, DataError>;

    /// Mark a note deleted and return its last live snapshot
    async fn soft_delete_note(&self, id: &str, owner_id: &str) -> Result<NoteRow, DataError>;

    /// Non-deleted note by id
    async fn get_note(&self, id: &str) -> Result<Option<NoteRow>, DataError>;

    /// Filtered page (zero-based `page`) and total count, from one snapshot
    async fn query_notes(
        &self,
        filter: &NoteFilter,
        page: u32,
        size: u32,
    ) -> Result<NotePage, DataError>;

    /// Sorted distinct languages of non-deleted notes
    async fn list_distinct_languages(&self) -> Result<Vec<String>, DataError>;
}
