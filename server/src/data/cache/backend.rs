//! Shared store backend trait definition

use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheError;

/// Shared key-value store backend
///
/// Both the in-memory and the Redis backends implement this trait. Everything
/// the store holds is a counter: rate-limit windows and generations. Only
/// single-key atomic operations are required; `get_counters` is a batched
/// read, not a transaction.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Increment a windowed counter, creating it with `window` as its expiry
    ///
    /// Creation and expiry assignment happen in one atomic step, so the
    /// counter never exists without a TTL.
    async fn incr_window(&self, key: &str, window: Duration) -> Result<i64, CacheError>;

    /// Increment a durable counter (no expiry)
    async fn incr(&self, key: &str) -> Result<i64, CacheError>;

    /// Current counter value, `None` if absent or expired
    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError>;

    /// Read several counters at once. Missing counters read as 0.
    async fn get_counters(&self, keys: &[String]) -> Result<Vec<i64>, CacheError>;

    /// Remaining TTL of a counter, `None` if absent or without expiry
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), CacheError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
