//! In-memory shared store using dashmap
//!
//! Counters live in a dashmap so that create-with-expiry and increment happen
//! under one shard lock. Counter expiry uses tokio's clock so paused-time
//! tests can step across window boundaries.
//!
//! Only suitable for a single instance: nothing is shared across processes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::backend::CacheBackend;
use super::error::CacheError;
use crate::core::constants::MEMORY_STORE_CLEANUP_EVERY;

struct CounterEntry {
    count: i64,
    /// `None` for durable counters (generations)
    expires_at: Option<tokio::time::Instant>,
}

impl CounterEntry {
    fn is_live(&self, now: tokio::time::Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-memory store implementation
pub struct InMemoryCache {
    counters: DashMap<String, CounterEntry>,
    cleanup_ops: AtomicU64,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
            cleanup_ops: AtomicU64::new(0),
        }
    }

    fn maybe_cleanup(&self) {
        let ops = self.cleanup_ops.fetch_add(1, Ordering::Relaxed);
        if ops.is_multiple_of(MEMORY_STORE_CLEANUP_EVERY) {
            let now = tokio::time::Instant::now();
            self.counters.retain(|_, entry| entry.is_live(now));
        }
    }

    fn live_count(&self, key: &str) -> Option<i64> {
        let now = tokio::time::Instant::now();
        self.counters
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.count)
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn incr_window(&self, key: &str, window: Duration) -> Result<i64, CacheError> {
        let now = tokio::time::Instant::now();
        let expires_at = Some(now + window);

        // Entry API holds the shard lock: creation, expiry and increment are one step
        let count = match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let counter = occupied.get_mut();
                if counter.is_live(now) {
                    counter.count += 1;
                } else {
                    counter.count = 1;
                    counter.expires_at = expires_at;
                }
                counter.count
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CounterEntry {
                    count: 1,
                    expires_at,
                });
                1
            }
        };

        self.maybe_cleanup();
        Ok(count)
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert(CounterEntry {
                count: 0,
                expires_at: None,
            });
        entry.count += 1;
        Ok(entry.count)
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError> {
        Ok(self.live_count(key))
    }

    async fn get_counters(&self, keys: &[String]) -> Result<Vec<i64>, CacheError> {
        Ok(keys
            .iter()
            .map(|key| self.live_count(key).unwrap_or(0))
            .collect())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let Some(expires_at) = self.counters.get(key).and_then(|entry| entry.expires_at) else {
            return Ok(None);
        };
        let remaining = expires_at.saturating_duration_since(tokio::time::Instant::now());
        Ok((remaining > Duration::ZERO).then_some(remaining))
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
