//! Shared store key encoding

use crate::core::constants::{KEY_PREFIX_GENERATION, KEY_PREFIX_RATE_LIMIT};

/// Shared store key builder
///
/// Values are used verbatim. Keys are only ever built, never parsed, so a
/// `:` inside a client id or language cannot be misread.
pub struct CacheKey;

impl CacheKey {
    // =========================================================================
    // Rate Limiting
    // =========================================================================

    /// Fixed-window counter for a client (`window_start` in Unix seconds)
    pub fn rate_limit(client_id: &str, window_start: u64) -> String {
        format!("{}:{}:{}", KEY_PREFIX_RATE_LIMIT, client_id, window_start)
    }

    // =========================================================================
    // Generations
    // =========================================================================

    /// Global generation counter
    pub fn generation_global() -> String {
        format!("{}:global", KEY_PREFIX_GENERATION)
    }

    /// Generation counter for an owner
    pub fn generation_owner(owner_id: &str) -> String {
        format!("{}:owner:{}", KEY_PREFIX_GENERATION, owner_id)
    }

    /// Generation counter for a language
    pub fn generation_language(language: &str) -> String {
        format!("{}:lang:{}", KEY_PREFIX_GENERATION, language)
    }
}
