//! Note service
//!
//! Write path: every committed mutation is followed by a coordinator
//! publish. The write has already happened at that point, so a failed publish
//! does not fail the call: the event is deferred for background retry and
//! this instance drops its cached pages.
//!
//! Read path: listing and search go through the query cache. Single-note
//! reads and the language list are served live.

use std::sync::Arc;

use crate::data::coherency::{Coordinator, MutationEvent};
use crate::data::error::DataError;
use crate::data::query_cache::{QueryCache, QueryKey, QueryKeyError, QueryOutcome, QueryParams};
use crate::data::traits::NoteRepository;
use crate::data::types::{NewNote, NoteRow, NoteUpdate};

pub struct NoteService {
    repository: Arc<dyn NoteRepository>,
    coordinator: Arc<Coordinator>,
    query_cache: Arc<QueryCache>,
    max_page_size: u32,
}

impl NoteService {
    pub fn new(
        repository: Arc<dyn NoteRepository>,
        coordinator: Arc<Coordinator>,
        query_cache: Arc<QueryCache>,
        max_page_size: u32,
    ) -> Self {
        Self {
            repository,
            coordinator,
            query_cache,
            max_page_size,
        }
    }

    pub async fn create(&self, note: &NewNote) -> Result<NoteRow, DataError> {
        let created = self.repository.create_note(note).await?;
        self.publish(MutationEvent::created(&created)).await;
        Ok(created)
    }

    pub async fn update(&self, id: &str, update: &NoteUpdate) -> Result<NoteRow, DataError> {
        let change = self.repository.update_note(id, update).await?;
        self.publish(MutationEvent::updated(&change.before, &change.after))
            .await;
        Ok(change.after)
    }

    pub async fn delete(&self, id: &str, owner_id: &str) -> Result<(), DataError> {
        let deleted = self.repository.soft_delete_note(id, owner_id).await?;
        self.publish(MutationEvent::deleted(&deleted)).await;
        Ok(())
    }

    /// A note visible to `requester`: the owner sees their own notes, anyone
    /// else only public ones. Hidden notes are reported as missing.
    pub async fn get(&self, id: &str, requester: Option<&str>) -> Result<NoteRow, DataError> {
        let note = self
            .repository
            .get_note(id)
            .await?
            .ok_or_else(|| DataError::not_found("note", id))?;

        let is_owner = requester.is_some_and(|r| r == note.owner_id);
        if note.is_public() || is_owner {
            Ok(note)
        } else {
            Err(DataError::not_found("note", id))
        }
    }

    /// Canonical cache key for `params` under this service's page size limit
    pub fn key(&self, params: QueryParams) -> Result<QueryKey, QueryKeyError> {
        QueryKey::canonical(params, self.max_page_size)
    }

    /// Filtered page through the query cache
    pub async fn query(&self, key: QueryKey) -> Result<QueryOutcome, DataError> {
        let repository = Arc::clone(&self.repository);
        self.query_cache
            .get_or_load(key, move |key| async move {
                repository
                    .query_notes(&key.filter(), key.page, key.size)
                    .await
            })
            .await
    }

    pub async fn languages(&self) -> Result<Vec<String>, DataError> {
        self.repository.list_distinct_languages().await
    }

    async fn publish(&self, event: MutationEvent) {
        if let Err(e) = self.coordinator.publish(&event).await {
            tracing::warn!(
                note_id = %event.note_id,
                kind = event.kind.as_str(),
                error = %e,
                "Failed to publish invalidation, deferring"
            );
            self.coordinator.defer(event).await;
            self.query_cache.invalidate_all();
        }
    }
}
