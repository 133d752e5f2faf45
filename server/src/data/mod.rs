//! Data layer
//!
//! - `cache` - Shared key-value store (memory or Redis) and admission control
//! - `coherency` - Generation counters that decide whether cached reads are still valid
//! - `query_cache` - In-process cache of paginated note queries
//! - `sqlite` - Record store for notes
//! - `traits` / `types` - Record store interface and row types
//! - `error` - Record store error type

pub mod cache;
pub mod coherency;
pub mod error;
pub mod query_cache;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::DataError;
pub use sqlite::SqliteService;
pub use traits::NoteRepository;
