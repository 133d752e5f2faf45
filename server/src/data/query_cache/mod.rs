//! Read-path query cache
//!
//! Caches pages of note query results in process, keyed by canonical
//! [`QueryKey`]. Every hit is validated against the coherency coordinator
//! before it is served; stale and missing entries are rebuilt.
//!
//! ## Rebuilds
//!
//! Concurrent rebuilds of one key are coalesced: the first reader registers a
//! shared future in the in-flight map and later readers await the same
//! future. The rebuild itself runs in a spawned task, so a reader that goes
//! away (client disconnect) only stops waiting; the rebuild completes for
//! everyone else.
//!
//! The generation snapshot is taken before the record store is queried. A
//! write that lands during the query therefore leaves the new entry already
//! stale instead of stamping old rows with new generations.
//!
//! ## Degraded mode
//!
//! If the coordinator cannot be reached, results are read live from the
//! record store and not cached. The same holds while the coordinator still
//! has deferred invalidations queued. A cached entry is never served
//! unvalidated.

mod key;

pub use key::{QueryKey, QueryKeyError, QueryParams, RequesterScope};

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use moka::future::Cache;

use crate::core::config::{EvictionPolicy, QueryCacheConfig};
use crate::data::coherency::{Coordinator, GenerationStamp};
use crate::data::error::DataError;
use crate::data::types::NotePage;

/// A cached page and the generations it was built at
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub page: NotePage,
    pub stamp: GenerationStamp,
    pub stored_at: DateTime<Utc>,
}

/// How a result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Valid cached entry
    Hit,
    /// No entry; rebuilt and cached
    Miss,
    /// Entry superseded by a write; rebuilt and replaced
    Stale,
    /// Coordinator unreachable; read live, not cached
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Stale => "STALE",
            Self::Bypass => "BYPASS",
        }
    }
}

#[derive(Debug)]
pub struct QueryOutcome {
    pub entry: Arc<CacheEntry>,
    pub status: CacheStatus,
}

#[derive(Debug, Clone)]
struct Rebuilt {
    entry: Arc<CacheEntry>,
    cached: bool,
}

type RebuildResult = Result<Rebuilt, Arc<DataError>>;
type RebuildFuture = Shared<BoxFuture<'static, RebuildResult>>;

/// In-process query cache with coordinator validation
pub struct QueryCache {
    entries: Cache<QueryKey, Arc<CacheEntry>>,
    in_flight: Arc<DashMap<QueryKey, RebuildFuture>>,
    coordinator: Arc<Coordinator>,
}

impl QueryCache {
    pub fn new(config: &QueryCacheConfig, coordinator: Arc<Coordinator>) -> Self {
        let policy = match config.eviction_policy {
            EvictionPolicy::Lru => moka::policy::EvictionPolicy::lru(),
            EvictionPolicy::TinyLfu => moka::policy::EvictionPolicy::tiny_lfu(),
        };
        tracing::debug!(
            max_entries = config.max_entries,
            eviction_policy = %config.eviction_policy,
            "Initializing query cache"
        );

        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .eviction_policy(policy)
            .build();

        Self {
            entries,
            in_flight: Arc::new(DashMap::new()),
            coordinator,
        }
    }

    /// Raw lookup, without validation
    pub async fn get(&self, key: &QueryKey) -> Option<Arc<CacheEntry>> {
        self.entries.get(key).await
    }

    /// Store (or replace) a page built at `stamp`
    pub async fn put(&self, key: QueryKey, page: NotePage, stamp: GenerationStamp) -> Arc<CacheEntry> {
        store(&self.entries, key, page, stamp).await
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Drop every cached page held by this instance
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Serve `key` from cache if valid, otherwise rebuild it with `loader`
    ///
    /// `loader` runs at most once per coalesced rebuild and may be dropped
    /// unused when another reader's rebuild is already in flight.
    pub async fn get_or_load<F, Fut>(
        &self,
        key: QueryKey,
        loader: F,
    ) -> Result<QueryOutcome, DataError>
    where
        F: FnOnce(QueryKey) -> Fut + Send + 'static,
        Fut: Future<Output = Result<NotePage, DataError>> + Send + 'static,
    {
        if self.coordinator.has_pending() {
            tracing::debug!(
                key = %key.encode(),
                "Invalidations pending, serving live result"
            );
            return self.bypass(key, loader).await;
        }

        let status = match self.entries.get(&key).await {
            Some(entry) => match self.coordinator.validate(&entry.stamp).await {
                Ok(true) => {
                    tracing::trace!(key = %key.encode(), "Query cache hit");
                    return Ok(QueryOutcome {
                        entry,
                        status: CacheStatus::Hit,
                    });
                }
                Ok(false) => {
                    tracing::debug!(key = %key.encode(), "Stale cache entry detected, rebuilding");
                    CacheStatus::Stale
                }
                Err(e) => {
                    tracing::warn!(
                        key = %key.encode(),
                        error = %e,
                        "Coordinator unavailable, serving live result"
                    );
                    return self.bypass(key, loader).await;
                }
            },
            None => CacheStatus::Miss,
        };

        let rebuilt = self
            .join_or_start(key.clone(), loader)
            .await
            .map_err(|shared| {
                Arc::try_unwrap(shared).unwrap_or_else(|e| DataError::Rebuild(e.to_string()))
            })?;

        let status = if rebuilt.cached {
            status
        } else {
            CacheStatus::Bypass
        };
        tracing::trace!(key = %key.encode(), status = status.as_str(), "Query cache rebuild");
        Ok(QueryOutcome {
            entry: rebuilt.entry,
            status,
        })
    }

    async fn bypass<F, Fut>(&self, key: QueryKey, loader: F) -> Result<QueryOutcome, DataError>
    where
        F: FnOnce(QueryKey) -> Fut,
        Fut: Future<Output = Result<NotePage, DataError>>,
    {
        let page = loader(key.clone()).await?;
        Ok(QueryOutcome {
            entry: Arc::new(CacheEntry {
                key,
                page,
                stamp: GenerationStamp::default(),
                stored_at: Utc::now(),
            }),
            status: CacheStatus::Bypass,
        })
    }

    fn join_or_start<F, Fut>(&self, key: QueryKey, loader: F) -> RebuildFuture
    where
        F: FnOnce(QueryKey) -> Fut + Send + 'static,
        Fut: Future<Output = Result<NotePage, DataError>> + Send + 'static,
    {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                tracing::trace!(key = %key.encode(), "Joining in-flight rebuild");
                occupied.get().clone()
            }
            Entry::Vacant(vacant) => {
                let entries = self.entries.clone();
                let in_flight = Arc::clone(&self.in_flight);
                let coordinator = Arc::clone(&self.coordinator);
                let task_key = key.clone();

                let task = tokio::spawn(async move {
                    let result = rebuild(&coordinator, &entries, task_key.clone(), loader).await;
                    // Cache first, then leave the registry: late readers see one or the other
                    in_flight.remove(&task_key);
                    result
                });

                let shared = async move {
                    match task.await {
                        Ok(result) => result,
                        Err(e) => Err(Arc::new(DataError::Rebuild(e.to_string()))),
                    }
                }
                .boxed()
                .shared();

                vacant.insert(shared.clone());
                shared
            }
        }
    }
}

async fn store(
    entries: &Cache<QueryKey, Arc<CacheEntry>>,
    key: QueryKey,
    page: NotePage,
    stamp: GenerationStamp,
) -> Arc<CacheEntry> {
    let entry = Arc::new(CacheEntry {
        key: key.clone(),
        page,
        stamp,
        stored_at: Utc::now(),
    });
    entries.insert(key, Arc::clone(&entry)).await;
    entry
}

async fn rebuild<F, Fut>(
    coordinator: &Coordinator,
    entries: &Cache<QueryKey, Arc<CacheEntry>>,
    key: QueryKey,
    loader: F,
) -> RebuildResult
where
    F: FnOnce(QueryKey) -> Fut,
    Fut: Future<Output = Result<NotePage, DataError>>,
{
    // A rebuild may have finished while this reader was still validating
    if let Some(current) = entries.get(&key).await
        && let Ok(true) = coordinator.validate(&current.stamp).await
    {
        tracing::trace!(key = %key.encode(), "Entry already rebuilt");
        return Ok(Rebuilt {
            entry: current,
            cached: true,
        });
    }

    // Snapshot before querying
    let stamp = match coordinator
        .snapshot(&Coordinator::dependencies(&key))
        .await
    {
        Ok(stamp) => Some(stamp),
        Err(e) => {
            tracing::warn!(
                key = %key.encode(),
                error = %e,
                "Coordinator unavailable, result will not be cached"
            );
            None
        }
    };

    let page = loader(key.clone()).await.map_err(Arc::new)?;

    match stamp {
        Some(stamp) => Ok(Rebuilt {
            entry: store(entries, key, page, stamp).await,
            cached: true,
        }),
        None => Ok(Rebuilt {
            entry: Arc::new(CacheEntry {
                key,
                page,
                stamp: GenerationStamp::default(),
                stored_at: Utc::now(),
            }),
            cached: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::data::cache::CacheService;
    use crate::data::cache::testing::{Fault, FaultyBackend, FlakyBackend};
    use crate::data::coherency::{GenerationScope, MutationEvent};
    use crate::data::types::{NoteRow, Visibility};

    fn config(max_entries: u64) -> QueryCacheConfig {
        QueryCacheConfig {
            max_entries,
            eviction_policy: EvictionPolicy::Lru,
            max_page_size: 100,
        }
    }

    fn setup(max_entries: u64) -> (QueryCache, Arc<Coordinator>) {
        let coordinator = Arc::new(Coordinator::new(Arc::new(CacheService::in_memory())));
        (QueryCache::new(&config(max_entries), coordinator.clone()), coordinator)
    }

    fn note(owner: &str, visibility: Visibility) -> NoteRow {
        NoteRow {
            id: format!("{owner}-1"),
            owner_id: owner.into(),
            title: "t".into(),
            content: "c".into(),
            visibility,
            language: None,
            created_at: 1,
            updated_at: 1,
            deleted_at: None,
        }
    }

    fn public_key() -> QueryKey {
        QueryKey::for_test(RequesterScope::Anonymous, None)
    }

    /// Loader returning a page whose total is the call number
    fn counting_loader(
        calls: Arc<AtomicUsize>,
        delay: Duration,
    ) -> impl FnOnce(QueryKey) -> BoxFuture<'static, Result<NotePage, DataError>> + Send + 'static
    {
        move |_key| {
            async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(delay).await;
                Ok(NotePage {
                    records: Vec::new(),
                    total: call as u64,
                })
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (cache, _) = setup(100);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(first.status, CacheStatus::Miss);

        let second = cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.entry.page.total, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_in_dependency_makes_entry_stale() {
        let (cache, coordinator) = setup(100);
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();

        // Private write by someone else: anonymous listings stay valid
        coordinator
            .publish(&MutationEvent::created(&note("bob", Visibility::Private)))
            .await
            .unwrap();
        let outcome = cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::Hit);

        coordinator
            .publish(&MutationEvent::created(&note("bob", Visibility::Public)))
            .await
            .unwrap();
        let outcome = cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::Stale);
        assert_eq!(outcome.entry.page.total, 2);

        // Replaced, not just evicted
        let cached = cache.get(&public_key()).await.unwrap();
        assert_eq!(cached.page.total, 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_rebuild_once() {
        let (cache, _) = setup(100);
        let cache = Arc::new(cache);
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let loader = counting_loader(calls.clone(), Duration::from_millis(50));
                tokio::spawn(async move { cache.get_or_load(public_key(), loader).await })
            })
            .collect();

        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert_eq!(outcome.entry.page.total, 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_stale_readers_rebuild_once() {
        let (cache, coordinator) = setup(100);
        let cache = Arc::new(cache);
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
        coordinator
            .publish(&MutationEvent::created(&note("alice", Visibility::Public)))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let loader = counting_loader(calls.clone(), Duration::from_millis(50));
                tokio::spawn(async move { cache.get_or_load(public_key(), loader).await })
            })
            .collect();

        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert_eq!(outcome.status, CacheStatus::Stale);
            assert_eq!(outcome.entry.page.total, 2);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_validation_does_not_start_second_rebuild() {
        let (store, backend) = FlakyBackend::service();
        let coordinator = Arc::new(Coordinator::new(store));
        let cache = Arc::new(QueryCache::new(&config(100), coordinator.clone()));
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
        coordinator
            .publish(&MutationEvent::created(&note("alice", Visibility::Public)))
            .await
            .unwrap();

        // Reader A is stuck validating the stale entry
        backend.set_delay(Duration::from_millis(200));
        let slow_reader = {
            let cache = cache.clone();
            let loader = counting_loader(calls.clone(), Duration::ZERO);
            tokio::spawn(async move { cache.get_or_load(public_key(), loader).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Reader B rebuilds and leaves the registry before A is done
        backend.set_delay(Duration::ZERO);
        let fast = cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(fast.status, CacheStatus::Stale);
        assert_eq!(fast.entry.page.total, 2);

        let slow = slow_reader.await.unwrap().unwrap();
        assert_eq!(slow.entry.page.total, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pending_invalidations_bypass_cache() {
        let (cache, coordinator) = setup(100);
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();

        // A write whose publish failed: its bump has not landed yet
        coordinator
            .defer(MutationEvent::created(&note("alice", Visibility::Public)))
            .await;
        let outcome = cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::Bypass);
        assert_eq!(outcome.entry.page.total, 2);

        coordinator.retry_deferred().await.unwrap();
        let outcome = cache
            .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::Stale);
        assert_eq!(outcome.entry.page.total, 3);
    }

    #[tokio::test]
    async fn test_invalidate_all_drops_entries() {
        let (cache, _) = setup(100);
        cache
            .put(public_key(), NotePage::default(), GenerationStamp::default())
            .await;
        cache.invalidate_all();
        assert!(cache.get(&public_key()).await.is_none());
    }

    #[tokio::test]
    async fn test_abandoned_reader_does_not_cancel_rebuild() {
        let (cache, _) = setup(100);
        let cache = Arc::new(cache);
        let calls = Arc::new(AtomicUsize::new(0));

        let reader = {
            let cache = cache.clone();
            let loader = counting_loader(calls.clone(), Duration::from_millis(100));
            tokio::spawn(async move { cache.get_or_load(public_key(), loader).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        reader.abort();

        let outcome = cache
            .get_or_load(
                public_key(),
                counting_loader(calls.clone(), Duration::from_millis(100)),
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::Miss);
        assert_eq!(outcome.entry.page.total, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_during_rebuild_leaves_entry_stale() {
        let (cache, coordinator) = setup(100);
        let racing = coordinator.clone();

        let outcome = cache
            .get_or_load(public_key(), move |_key| async move {
                racing
                    .publish(&MutationEvent::created(&note("alice", Visibility::Public)))
                    .await
                    .map_err(|e| DataError::Rebuild(e.to_string()))?;
                Ok(NotePage::default())
            })
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::Miss);

        let calls = Arc::new(AtomicUsize::new(0));
        let next = cache
            .get_or_load(public_key(), counting_loader(calls, Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(next.status, CacheStatus::Stale);
    }

    #[tokio::test]
    async fn test_loader_error_propagates_and_is_not_cached() {
        let (cache, _) = setup(100);

        let err = cache
            .get_or_load(public_key(), |_key| async {
                Err(DataError::not_found("note", "x"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
        assert!(cache.get(&public_key()).await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_coordinator_bypasses_cache() {
        let coordinator = Arc::new(Coordinator::new(FaultyBackend::service(Fault::Unreachable)));
        let cache = QueryCache::new(&config(100), coordinator);
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2 {
            let outcome = cache
                .get_or_load(public_key(), counting_loader(calls.clone(), Duration::ZERO))
                .await
                .unwrap();
            assert_eq!(outcome.status, CacheStatus::Bypass);
            assert_eq!(outcome.entry.page.total, expected);
        }
        assert!(cache.get(&public_key()).await.is_none());
    }

    #[tokio::test]
    async fn test_cached_entry_not_served_when_validation_fails() {
        let coordinator = Arc::new(Coordinator::new(FaultyBackend::service(Fault::Unreachable)));
        let cache = QueryCache::new(&config(100), coordinator);
        cache
            .put(
                public_key(),
                NotePage {
                    records: Vec::new(),
                    total: 99,
                },
                GenerationStamp::new(vec![(GenerationScope::Global, 0)]),
            )
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = cache
            .get_or_load(public_key(), counting_loader(calls, Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::Bypass);
        assert_eq!(outcome.entry.page.total, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction_at_capacity() {
        let (cache, _) = setup(2);
        let key = |page: u32| {
            let mut params = QueryParams::new(RequesterScope::Anonymous);
            params.page = Some(page);
            QueryKey::canonical(params, 100).unwrap()
        };

        cache
            .put(key(0), NotePage::default(), GenerationStamp::default())
            .await;
        cache
            .put(key(1), NotePage::default(), GenerationStamp::default())
            .await;
        cache.entries.run_pending_tasks().await;

        // Touch page 0 so page 1 is least recently used
        assert!(cache.get(&key(0)).await.is_some());
        cache.entries.run_pending_tasks().await;

        cache
            .put(key(2), NotePage::default(), GenerationStamp::default())
            .await;
        cache.entries.run_pending_tasks().await;

        assert!(cache.entries.contains_key(&key(0)));
        assert!(!cache.entries.contains_key(&key(1)));
        assert!(cache.entries.contains_key(&key(2)));
        assert_eq!(cache.entry_count(), 2);
    }
}
