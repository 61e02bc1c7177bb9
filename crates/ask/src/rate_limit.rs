//! Per-client admission control.
//!
//! One token bucket per client identity, created on first use. The identity
//! map is locked only to look up or create a bucket; each bucket guards its
//! own token state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Token bucket rate limiter keyed by client identity.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    burst: f64,
    buckets: Mutex<HashMap<String, Arc<TokenBucket>>>,
}

#[derive(Debug)]
struct TokenBucket {
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: now,
            }),
        }
    }

    fn try_take(&self, rate: f64, capacity: f64, now: Instant) -> bool {
        let mut state = lock(&self.state);

        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * rate).min(capacity);
        if now > state.last_refill {
            state.last_refill = now;
        }

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Unused for longer than `max_idle` and refilled to capacity, so
    /// dropping it cannot hand the client extra tokens.
    fn is_evictable(&self, rate: f64, capacity: f64, max_idle: Duration, now: Instant) -> bool {
        let state = lock(&self.state);
        let idle = now.saturating_duration_since(state.last_refill);
        idle > max_idle && state.tokens + idle.as_secs_f64() * rate >= capacity
    }
}

impl RateLimiter {
    /// Create a limiter refilling `rate` tokens per second up to `burst`.
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            rate,
            burst: f64::from(burst),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Consume one token for `identity`, if available.
    pub fn allow(&self, identity: &str) -> bool {
        self.allow_at(identity, Instant::now())
    }

    /// [`allow`](Self::allow) with an explicit clock reading.
    pub fn allow_at(&self, identity: &str, now: Instant) -> bool {
        let bucket = {
            let mut buckets = lock(&self.buckets);
            Arc::clone(
                buckets
                    .entry(identity.to_string())
                    .or_insert_with(|| Arc::new(TokenBucket::full(self.burst, now))),
            )
        };

        bucket.try_take(self.rate, self.burst, now)
    }

    /// Drop buckets unused for longer than `max_idle` whose tokens have fully
    /// refilled. Returns how many were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        self.evict_idle_at(max_idle, Instant::now())
    }

    /// [`evict_idle`](Self::evict_idle) with an explicit clock reading.
    pub fn evict_idle_at(&self, max_idle: Duration, now: Instant) -> usize {
        let mut buckets = lock(&self.buckets);
        let before = buckets.len();
        buckets.retain(|_, bucket| !bucket.is_evictable(self.rate, self.burst, max_idle, now));
        before - buckets.len()
    }

    /// Number of identities currently holding a bucket.
    pub fn tracked_identities(&self) -> usize {
        lock(&self.buckets).len()
    }
}

/// The identity a request is rate limited under.
///
/// The first `X-Forwarded-For` entry wins; otherwise the peer address with
/// any trailing `:port` removed.
pub fn client_identity(forwarded_for: Option<&str>, remote_addr: &str) -> String {
    if let Some(first) = forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return first.to_string();
    }

    match remote_addr.rfind(':') {
        Some(idx) => remote_addr[..idx].to_string(),
        None => remote_addr.to_string(),
    }
}

// Bucket state stays consistent even if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
