//! Coherency protocol types

use std::fmt;

use chrono::{DateTime, Utc};

use crate::data::cache::CacheKey;
use crate::data::types::{NoteRow, Visibility};

/// A dimension with its own generation counter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GenerationScope {
    /// Corpus visible across owners (public notes)
    Global,
    Owner(String),
    Language(String),
}

impl GenerationScope {
    /// Shared store key holding this scope's counter
    pub fn store_key(&self) -> String {
        match self {
            Self::Global => CacheKey::generation_global(),
            Self::Owner(owner_id) => CacheKey::generation_owner(owner_id),
            Self::Language(language) => CacheKey::generation_language(language),
        }
    }
}

impl fmt::Display for GenerationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Owner(owner_id) => write!(f, "owner:{owner_id}"),
            Self::Language(language) => write!(f, "lang:{language}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A committed record mutation, as seen by the coordinator
///
/// `previous_*` carry the values before an update so that queries matching
/// the old state are invalidated too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    pub note_id: String,
    pub owner_id: String,
    pub kind: MutationKind,
    pub language: Option<String>,
    pub previous_language: Option<String>,
    pub visibility: Visibility,
    pub previous_visibility: Option<Visibility>,
}

impl MutationEvent {
    pub fn created(note: &NoteRow) -> Self {
        Self {
            note_id: note.id.clone(),
            owner_id: note.owner_id.clone(),
            kind: MutationKind::Create,
            language: note.language.clone(),
            previous_language: None,
            visibility: note.visibility,
            previous_visibility: None,
        }
    }

    pub fn updated(before: &NoteRow, after: &NoteRow) -> Self {
        Self {
            note_id: after.id.clone(),
            owner_id: after.owner_id.clone(),
            kind: MutationKind::Update,
            language: after.language.clone(),
            previous_language: before.language.clone(),
            visibility: after.visibility,
            previous_visibility: Some(before.visibility),
        }
    }

    pub fn deleted(note: &NoteRow) -> Self {
        Self {
            note_id: note.id.clone(),
            owner_id: note.owner_id.clone(),
            kind: MutationKind::Delete,
            language: note.language.clone(),
            previous_language: None,
            visibility: note.visibility,
            previous_visibility: None,
        }
    }

    /// Whether the note is, or was, visible to anonymous readers
    pub fn touches_public(&self) -> bool {
        self.visibility == Visibility::Public
            || self.previous_visibility == Some(Visibility::Public)
    }

    /// Every scope whose counter this event bumps (deduplicated)
    pub fn affected_scopes(&self) -> Vec<GenerationScope> {
        let mut scopes = vec![GenerationScope::Owner(self.owner_id.clone())];
        if let Some(language) = &self.language {
            scopes.push(GenerationScope::Language(language.clone()));
        }
        if let Some(previous) = &self.previous_language
            && self.language.as_ref() != Some(previous)
        {
            scopes.push(GenerationScope::Language(previous.clone()));
        }
        if self.touches_public() {
            scopes.push(GenerationScope::Global);
        }
        scopes
    }
}

/// Emitted once per bumped scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationSignal {
    pub scope: GenerationScope,
    pub generation: i64,
    /// Note that caused the bump
    pub note_id: String,
    pub emitted_at: DateTime<Utc>,
}

/// Generation values read at one point, tagged onto a cache entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationStamp {
    generations: Vec<(GenerationScope, i64)>,
}

impl GenerationStamp {
    pub fn new(generations: Vec<(GenerationScope, i64)>) -> Self {
        Self { generations }
    }

    pub fn scopes(&self) -> impl Iterator<Item = &GenerationScope> {
        self.generations.iter().map(|(scope, _)| scope)
    }

    pub fn get(&self, scope: &GenerationScope) -> Option<i64> {
        self.generations
            .iter()
            .find(|(s, _)| s == scope)
            .map(|(_, generation)| *generation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(GenerationScope, i64)> {
        self.generations.iter()
    }
}
