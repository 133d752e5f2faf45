//! Cache coherency coordinator
//!
//! Every committed mutation bumps a handful of generation counters in the
//! shared store: the owner's, the note's language (old and new), and the
//! global one when public visibility is involved. Cached query results are
//! stamped with the counters they depend on and are valid only while every
//! stamped counter is unchanged.
//!
//! Invalidation is O(affected scopes) per write and validation is one batched
//! read per cache hit. The price is over-invalidation: a write invalidates
//! every cached query sharing a dimension with it, not just the ones whose
//! rows changed.
//!
//! A publish that fails (store unreachable) is deferred, not dropped: the
//! event is queued and a background task republishes it with backoff until
//! the counters are bumped. While anything is queued, [`Coordinator::has_pending`]
//! is true and local readers must not trust cached entries.

mod types;

pub use types::{
    GenerationScope, GenerationStamp, InvalidationSignal, MutationEvent, MutationKind,
};

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Notify, broadcast, watch};
use tokio::task::JoinHandle;

use crate::core::constants::{
    INVALIDATION_CHANNEL_CAPACITY, INVALIDATION_RETRY_INITIAL_MS, INVALIDATION_RETRY_MAX_MS,
};
use crate::data::cache::{CacheError, CacheService};
use crate::data::query_cache::{QueryKey, RequesterScope};

/// Generation counter coordinator
///
/// All counters live in the shared store so any number of instances can
/// publish and validate. Local state is the broadcast channel and the queue
/// of events whose publish has not gone through yet.
pub struct Coordinator {
    cache: Arc<CacheService>,
    signals: broadcast::Sender<InvalidationSignal>,
    deferred: Mutex<VecDeque<MutationEvent>>,
    /// Queued plus in-retry events; drops only after a successful publish
    pending: AtomicUsize,
    wake: Notify,
}

impl Coordinator {
    pub fn new(cache: Arc<CacheService>) -> Self {
        let (signals, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);
        Self {
            cache,
            signals,
            deferred: Mutex::new(VecDeque::new()),
            pending: AtomicUsize::new(0),
            wake: Notify::new(),
        }
    }

    /// Bump the counters of every scope `event` touches
    ///
    /// Call after the mutation has committed. Re-publishing an event only
    /// bumps the counters again, which is harmless.
    pub async fn publish(
        &self,
        event: &MutationEvent,
    ) -> Result<Vec<InvalidationSignal>, CacheError> {
        let mut emitted = Vec::new();
        for scope in event.affected_scopes() {
            let generation = self.cache.incr(&scope.store_key()).await?;
            emitted.push(InvalidationSignal {
                scope,
                generation,
                note_id: event.note_id.clone(),
                emitted_at: Utc::now(),
            });
        }

        for signal in &emitted {
            // Err only means nobody is subscribed
            let _ = self.signals.send(signal.clone());
        }

        tracing::debug!(
            note_id = %event.note_id,
            kind = event.kind.as_str(),
            scopes = emitted.len(),
            "Published invalidation"
        );
        Ok(emitted)
    }

    /// Queue `event` for republishing after a failed publish
    pub async fn defer(&self, event: MutationEvent) {
        let mut deferred = self.deferred.lock().await;
        deferred.push_back(event);
        self.pending.fetch_add(1, Ordering::SeqCst);
        drop(deferred);
        self.wake.notify_one();
    }

    /// Whether some committed write has not bumped its counters yet
    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Republish deferred events in order, stopping at the first failure
    ///
    /// Returns how many were published. A failed event goes back to the
    /// front of the queue.
    pub async fn retry_deferred(&self) -> Result<usize, CacheError> {
        let mut published = 0;
        loop {
            let Some(event) = self.deferred.lock().await.pop_front() else {
                return Ok(published);
            };
            if let Err(e) = self.publish(&event).await {
                self.deferred.lock().await.push_front(event);
                return Err(e);
            }
            self.pending.fetch_sub(1, Ordering::SeqCst);
            published += 1;
        }
    }

    /// Drain deferred events in the background until shutdown
    pub fn start_retry_task(
        self: &Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let initial = Duration::from_millis(INVALIDATION_RETRY_INITIAL_MS);
            let max = Duration::from_millis(INVALIDATION_RETRY_MAX_MS);
            let mut backoff = initial;

            loop {
                let wait = if coordinator.has_pending() {
                    match coordinator.retry_deferred().await {
                        Ok(published) => {
                            if published > 0 {
                                tracing::info!(published, "Deferred invalidations published");
                            }
                            backoff = initial;
                            continue;
                        }
                        Err(e) => {
                            tracing::debug!(
                                error = %e,
                                retry_in_ms = backoff.as_millis() as u64,
                                "Deferred invalidations still failing"
                            );
                            let wait = backoff;
                            backoff = (backoff * 2).min(max);
                            Some(wait)
                        }
                    }
                } else {
                    None
                };

                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            let left = coordinator.pending.load(Ordering::SeqCst);
                            if left > 0 {
                                tracing::warn!(
                                    pending = left,
                                    "Shutting down with unpublished invalidations"
                                );
                            }
                            break;
                        }
                    }
                    _ = async {
                        match wait {
                            Some(delay) => tokio::time::sleep(delay).await,
                            None => coordinator.wake.notified().await,
                        }
                    } => {}
                }
            }
        })
    }

    /// Current generation of a scope (0 if never bumped)
    pub async fn current_generation(&self, scope: &GenerationScope) -> Result<i64, CacheError> {
        Ok(self
            .cache
            .get_counter(&scope.store_key())
            .await?
            .unwrap_or(0))
    }

    /// Scopes a cached query depends on
    ///
    /// Global always; the owner for owner-scoped queries; the language when
    /// the query filters by one.
    pub fn dependencies(key: &QueryKey) -> Vec<GenerationScope> {
        let mut scopes = vec![GenerationScope::Global];
        if let RequesterScope::Owner(owner_id) = &key.scope {
            scopes.push(GenerationScope::Owner(owner_id.clone()));
        }
        if let Some(language) = &key.language {
            scopes.push(GenerationScope::Language(language.clone()));
        }
        scopes
    }

    /// Read the current generations of `scopes` in one store call
    pub async fn snapshot(
        &self,
        scopes: &[GenerationScope],
    ) -> Result<GenerationStamp, CacheError> {
        let keys: Vec<String> = scopes.iter().map(GenerationScope::store_key).collect();
        let values = self.cache.get_counters(&keys).await?;
        if values.len() != scopes.len() {
            return Err(CacheError::Operation(format!(
                "expected {} generations, store returned {}",
                scopes.len(),
                values.len()
            )));
        }
        Ok(GenerationStamp::new(
            scopes.iter().cloned().zip(values).collect(),
        ))
    }

    /// Whether every generation in `stamp` is still current
    pub async fn validate(&self, stamp: &GenerationStamp) -> Result<bool, CacheError> {
        let scopes: Vec<GenerationScope> = stamp.scopes().cloned().collect();
        let current = self.snapshot(&scopes).await?;
        Ok(current == *stamp)
    }

    /// Local feed of emitted signals
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationSignal> {
        self.signals.subscribe()
    }
}
