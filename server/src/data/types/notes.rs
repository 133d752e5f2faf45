//! Note record types shared by the record store and the read path

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Visibility
// ============================================================================

/// Who can read a note
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    /// Readable by anyone, including anonymous callers
    Public,
    /// Readable by the owner only
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
        }
    }

    /// Parse case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Some(Self::Public),
            "PRIVATE" => Some(Self::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Note row from database (timestamps in microseconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub visibility: Visibility,
    pub language: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl NoteRow {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Fields for a new note
#[derive(Debug, Clone)]
pub struct NewNote {
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub visibility: Visibility,
    pub language: Option<String>,
}

/// Replacement fields for an existing note, on behalf of `owner_id`
#[derive(Debug, Clone)]
pub struct NoteUpdate {
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub visibility: Visibility,
    pub language: Option<String>,
}

/// Snapshots around a committed update
#[derive(Debug, Clone)]
pub struct NoteChange {
    pub before: NoteRow,
    pub after: NoteRow,
}

// ============================================================================
// Queries
// ============================================================================

/// Resolved filter set for `query_notes`
///
/// Soft-deleted notes are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    /// Substring matched against title or content (case-insensitive)
    pub text: Option<String>,
    pub visibility: Option<Visibility>,
    pub owner_id: Option<String>,
    pub language: Option<String>,
}

/// One page of notes plus the total across all pages, read as one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePage {
    pub records: Vec<NoteRow>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_parse() {
        assert_eq!(Visibility::parse("PUBLIC"), Some(Visibility::Public));
        assert_eq!(Visibility::parse(" private "), Some(Visibility::Private));
        assert_eq!(Visibility::parse("shared"), None);
    }

    #[test]
    fn test_visibility_serde() {
        assert_eq!(
            serde_json::to_string(&Visibility::Public).unwrap(),
            "\"PUBLIC\""
        );
        let v: Visibility = serde_json::from_str("\"PRIVATE\"").unwrap();
        assert_eq!(v, Visibility::Private);
        assert_eq!(Visibility::Public.to_string(), "PUBLIC");
    }
}
