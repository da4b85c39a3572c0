//! Per-client fixed-window rate limiting with block-on-exceed.
//!
//! Each client gets a bucket counting requests in the current window. A client
//! that goes over `points` requests is blocked for `block_duration`; once the
//! block lapses it starts over with a fresh window.
//!
//! Buckets live in a sharded concurrent map. An admission holds only its
//! shard's lock, so unrelated clients proceed in parallel and two requests
//! from the same client can never lose an update. The sweeper takes the same
//! shard locks, so it cannot evict a bucket out from under an admission.
//!
//! Time comes from `tokio::time::Instant` so tests can pause the clock.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::{RateLimitConfig, MAX_RATE_LIMIT_SECS};
use crate::observability::metrics;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Round a wait up to whole seconds for a `Retry-After` header.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

/// Counter state for one client.
#[derive(Debug, Clone)]
struct ClientBucket {
    count: u32,
    window_start: Instant,
    blocked_until: Option<Instant>,
    last_seen: Instant,
}

impl ClientBucket {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            blocked_until: None,
            last_seen: now,
        }
    }

    fn admit(&mut self, now: Instant, limits: &Limits) -> Decision {
        self.last_seen = now;

        if let Some(until) = self.blocked_until {
            if now < until {
                return Decision::Deny {
                    retry_after: until - now,
                };
            }
            self.blocked_until = None;
            self.start_window(now);
        }

        if now.duration_since(self.window_start) >= limits.duration {
            self.start_window(now);
        }

        self.count = self.count.saturating_add(1);
        if self.count > limits.points {
            self.blocked_until = Some(
                now.checked_add(limits.block_duration)
                    .unwrap_or_else(|| now + Duration::from_secs(MAX_RATE_LIMIT_SECS)),
            );
            return Decision::Deny {
                retry_after: limits.block_duration,
            };
        }

        Decision::Allow
    }

    fn start_window(&mut self, now: Instant) {
        self.count = 0;
        self.window_start = now;
    }
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    points: u32,
    duration: Duration,
    block_duration: Duration,
}

/// Snapshot of a bucket, for inspection and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSnapshot {
    pub count: u32,
    pub window_start: Instant,
    pub blocked_until: Option<Instant>,
}

/// Shared per-client rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    enabled: bool,
    limits: Limits,
    sweep_interval: Duration,
    buckets: DashMap<String, ClientBucket>,
}

impl RateLimiter {
    /// Durations are clamped to [`MAX_RATE_LIMIT_SECS`] so deadline arithmetic
    /// cannot overflow even if validation was skipped.
    pub fn new(config: &RateLimitConfig) -> Self {
        let clamp = |secs: u64| Duration::from_secs(secs.min(MAX_RATE_LIMIT_SECS));
        let duration = clamp(config.duration_secs);
        let sweep_interval = match config.sweep_interval_secs {
            0 => duration,
            secs => clamp(secs),
        }
        .max(Duration::from_secs(1));

        Self {
            inner: Arc::new(RateLimiterInner {
                enabled: config.enabled,
                limits: Limits {
                    points: config.points,
                    duration,
                    block_duration: clamp(config.block_duration_secs),
                },
                sweep_interval,
                buckets: DashMap::new(),
            }),
        }
    }

    /// Count one request for `client_id` and decide whether it may proceed.
    pub fn admit(&self, client_id: &str) -> Decision {
        if !self.inner.enabled {
            return Decision::Allow;
        }

        let now = Instant::now();
        let limits = &self.inner.limits;

        // Skip the key allocation for clients we have already seen.
        if let Some(mut bucket) = self.inner.buckets.get_mut(client_id) {
            return bucket.admit(now, limits);
        }

        self.inner
            .buckets
            .entry(client_id.to_owned())
            .or_insert_with(|| ClientBucket::new(now))
            .admit(now, limits)
    }

    /// Drop buckets idle for at least `duration + block_duration`.
    ///
    /// Returns the number of buckets removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let idle_limit = self
            .inner
            .limits
            .duration
            .saturating_add(self.inner.limits.block_duration);
        let before = self.inner.buckets.len();

        self.inner
            .buckets
            .retain(|_, bucket| now.duration_since(bucket.last_seen) < idle_limit);

        before.saturating_sub(self.inner.buckets.len())
    }

    /// Number of live client buckets.
    pub fn len(&self) -> usize {
        self.inner.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.buckets.is_empty()
    }

    pub fn snapshot(&self, client_id: &str) -> Option<BucketSnapshot> {
        self.inner.buckets.get(client_id).map(|bucket| BucketSnapshot {
            count: bucket.count,
            window_start: bucket.window_start,
            blocked_until: bucket.blocked_until,
        })
    }

    /// Periodically sweep idle buckets until shutdown.
    pub async fn run_sweeper(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.inner.enabled {
            return;
        }

        let mut ticker = time::interval(self.inner.sweep_interval);
        // The first tick completes immediately; nothing to sweep yet.
        ticker.tick().await;

        tracing::info!(
            interval_secs = self.inner.sweep_interval.as_secs(),
            "Rate limit sweeper starting"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep();
                    let remaining = self.len();
                    metrics::record_bucket_count(remaining);
                    if removed > 0 {
                        tracing::debug!(removed, remaining, "Evicted idle rate limit buckets");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
