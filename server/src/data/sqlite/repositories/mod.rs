//! SQLite repositories
//!
//! Row types live in `crate::data::types`.

pub mod note;

pub use note::{
    create_note, get_note, list_distinct_languages, query_notes, soft_delete_note, update_note,
};
