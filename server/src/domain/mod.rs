//! Domain logic
//!
//! - `notes` - write path with invalidation publishing, cached read path

pub mod notes;

pub use notes::NoteService;
