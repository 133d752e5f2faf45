//! Admission controller: per-client fixed-window counters in the shared store
//!
//! # Algorithm
//!
//! Time is cut into fixed windows aligned to the Unix epoch
//! (`window_start = now - now % window`). Each request increments
//! `ratelimit:{client}:{window_start}`; the counter is created together with
//! its expiry (see [`CacheService::incr_window`]) so no counter outlives its
//! window. A request is permitted iff the resulting count is within quota.
//!
//! The controller keeps no local state, so any number of instances can share
//! one store.
//!
//! # Store failures
//!
//! Fail-open: if the store errors or times out, the request is permitted with
//! `remaining = limit` and the failure is logged.
//!
//! # Known Limitations
//!
//! **Window Boundary Burst**: fixed windows allow up to 2x the quota across a
//! boundary (quota requests at the end of one window, quota more at the start
//! of the next).

use std::sync::Arc;
use std::time::Duration;

use super::CacheService;
use super::key::CacheKey;
use crate::core::config::RateLimitConfig;
use crate::core::constants::{DEFAULT_RATE_LIMIT_QUOTA, DEFAULT_RATE_LIMIT_WINDOW_SECS};
use crate::utils::time::now_secs;

/// Quota and window length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests permitted per client per window
    pub quota: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            quota: DEFAULT_RATE_LIMIT_QUOTA,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            quota: config.quota,
            window: Duration::from_secs(config.window_secs),
        }
    }
}

impl RateLimitPolicy {
    fn window_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub permitted: bool,
    pub limit: u32,
    /// `max(0, limit - count)`
    pub remaining: u32,
    /// Unix timestamp at which the current window ends
    pub reset_at: u64,
    /// Seconds until the next window (rejections only)
    pub retry_after: Option<u64>,
}

/// Fixed-window admission controller
pub struct RateLimiter {
    cache: Arc<CacheService>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(cache: Arc<CacheService>, policy: RateLimitPolicy) -> Self {
        Self { cache, policy }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Count one request for `client_id` and decide whether to admit it
    pub async fn allow(&self, client_id: &str) -> AdmissionDecision {
        self.allow_at(client_id, now_secs()).await
    }

    /// [`allow`](Self::allow) with an explicit clock reading (Unix seconds)
    pub async fn allow_at(&self, client_id: &str, now: u64) -> AdmissionDecision {
        let window_secs = self.policy.window_secs();
        let window_start = now - now % window_secs;
        let reset_at = window_start.saturating_add(window_secs);
        let limit = self.policy.quota;

        let key = CacheKey::rate_limit(client_id, window_start);
        let count = match self.cache.incr_window(&key, self.policy.window).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    client_id,
                    %key,
                    error = %e,
                    "Shared store unavailable, admitting request without rate limiting"
                );
                return AdmissionDecision {
                    permitted: true,
                    limit,
                    remaining: limit,
                    reset_at,
                    retry_after: None,
                };
            }
        };

        let limit_i64 = i64::from(limit);
        let permitted = count <= limit_i64;
        let remaining = u32::try_from(limit_i64.saturating_sub(count).max(0)).unwrap_or(0);

        tracing::trace!(client_id, count, limit, permitted, "Admission check");

        AdmissionDecision {
            permitted,
            limit,
            remaining,
            reset_at,
            retry_after: (!permitted).then(|| reset_at.saturating_sub(now).max(1)),
        }
    }
}
