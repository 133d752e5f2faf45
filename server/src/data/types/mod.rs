//! Shared data types

mod notes;

pub use notes::{NewNote, NoteChange, NoteFilter, NotePage, NoteRow, NoteUpdate, Visibility};
