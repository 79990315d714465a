//! Token bucket rate limiting for the upstream simulator.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        // Instants older than the last update refill nothing.
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = self.last_update.max(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// A shared token bucket limiter, safe to call from concurrent handlers.
///
/// The bucket starts full. A burst of zero admits nothing.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    rate: f64,
    burst: u32,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(burst as f64, Instant::now())),
            rate,
            burst,
        }
    }

    /// Limiter for `rate` requests/second with a burst of `rate / 10`
    /// (truncated). Returns `None` when `rate` does not enable limiting.
    pub fn per_second(rate: f64) -> Option<Self> {
        if rate > 0.0 && rate.is_finite() {
            Some(Self::new(rate, (rate / 10.0) as u32))
        } else {
            None
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Take one token if available.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    /// Take one token if available, as of `now`.
    pub fn allow_at(&self, now: Instant) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.try_acquire(self.burst as f64, self.rate, now)
    }
}
