//! Shared key-value store
//!
//! Pluggable backends behind [`CacheService`]:
//! - In-memory (default, single instance) - dashmap
//! - Redis-compatible (multi-instance) - deadpool-redis
//!
//! Also hosts the admission controller, which keeps all of its state here.

mod backend;
mod error;
mod key;
mod memory;
pub mod rate_limiter;
mod redis;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use backend::CacheBackend;
pub use error::CacheError;
pub use key::CacheKey;
pub use rate_limiter::{AdmissionDecision, RateLimitPolicy, RateLimiter};

use memory::InMemoryCache;

use crate::core::config::{StoreBackendType, StoreConfig};

/// Shared store facade
///
/// Every call is bounded by the configured store timeout; an elapsed
/// deadline surfaces as [`CacheError::Timeout`].
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
    timeout: Duration,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("backend", &self.backend.backend_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CacheService {
    /// Create the store from configuration
    pub async fn new(config: &StoreConfig) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            StoreBackendType::Memory => {
                tracing::debug!("Initializing in-memory shared store");
                Arc::new(InMemoryCache::new())
            }
            StoreBackendType::Redis => {
                let url = config.redis_url.as_ref().ok_or_else(|| {
                    CacheError::Config("redis_url required for Redis backend".into())
                })?;
                Arc::new(redis::RedisCache::new(url).await?)
            }
        };

        Ok(Self {
            backend,
            timeout: config.timeout,
        })
    }

    /// Wrap an arbitrary backend (test doubles)
    #[cfg(test)]
    pub fn from_backend(backend: Arc<dyn CacheBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// In-memory store with the default timeout
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::from_backend(
            Arc::new(InMemoryCache::new()),
            Duration::from_millis(crate::core::constants::DEFAULT_STORE_TIMEOUT_MS),
        )
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }

    // =========================================================================
    // Counters
    // =========================================================================

    /// Increment a windowed counter (created atomically with its expiry)
    pub async fn incr_window(&self, key: &str, window: Duration) -> Result<i64, CacheError> {
        self.bounded(self.backend.incr_window(key, window)).await
    }

    /// Increment a durable counter
    pub async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        self.bounded(self.backend.incr(key)).await
    }

    /// Remaining lifetime of a windowed counter
    #[cfg(test)]
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        self.bounded(self.backend.ttl(key)).await
    }

    pub async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError> {
        self.bounded(self.backend.get_counter(key)).await
    }

    /// Read several counters in one round trip (missing = 0)
    pub async fn get_counters(&self, keys: &[String]) -> Result<Vec<i64>, CacheError> {
        self.bounded(self.backend.get_counters(keys)).await
    }

    pub async fn health_check(&self) -> Result<(), CacheError> {
        self.bounded(self.backend.health_check()).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Fault, FaultyBackend};
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_from_config() {
        let config = StoreConfig {
            backend: StoreBackendType::Memory,
            redis_url: None,
            timeout: Duration::from_millis(100),
        };
        let service = CacheService::new(&config).await.unwrap();
        assert_eq!(service.backend_name(), "memory");
        assert!(service.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_redis_backend_requires_url() {
        let config = StoreConfig {
            backend: StoreBackendType::Redis,
            redis_url: None,
            timeout: Duration::from_millis(100),
        };
        let err = CacheService::new(&config).await.unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }

    #[tokio::test]
    async fn test_counters() {
        let service = CacheService::in_memory();

        assert_eq!(service.incr("gen:global").await.unwrap(), 1);
        assert_eq!(service.get_counter("gen:global").await.unwrap(), Some(1));
        assert_eq!(
            service
                .incr_window("ratelimit:a:0", Duration::from_secs(60))
                .await
                .unwrap(),
            1
        );
        assert!(service.ttl("ratelimit:a:0").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let service = FaultyBackend::service(Fault::Slow(Duration::from_secs(5)));
        let err = service.incr("gen:global").await.unwrap_err();
        assert!(matches!(err, CacheError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_errors() {
        let service = FaultyBackend::service(Fault::Unreachable);
        let err = service.health_check().await.unwrap_err();
        assert!(matches!(err, CacheError::Connection(_)));
    }
}
