//! Token-bucket admission control.
//!
//! The bucket refills lazily: every call first credits
//! `elapsed / refill_interval * capacity` tokens (capped at `capacity`) and
//! then decides. The limiter never sleeps. A denied caller gets `false`
//! back and decides itself whether to wait (see
//! [`RateLimiter::time_until_available`]) or fail.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::sync::lock;
use crate::{EuroparlError, Result};

/// Window over which a full bucket's worth of tokens is refilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitInterval {
    Second,
    #[default]
    Minute,
    Hour,
}

impl RateLimitInterval {
    pub fn as_duration(self) -> Duration {
        match self {
            RateLimitInterval::Second => Duration::from_secs(1),
            RateLimitInterval::Minute => Duration::from_secs(60),
            RateLimitInterval::Hour => Duration::from_secs(3600),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RateLimitInterval::Second => "second",
            RateLimitInterval::Minute => "minute",
            RateLimitInterval::Hour => "hour",
        }
    }
}

impl fmt::Display for RateLimitInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateLimitInterval {
    type Err = EuroparlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "second" => Ok(RateLimitInterval::Second),
            "minute" => Ok(RateLimitInterval::Minute),
            "hour" => Ok(RateLimitInterval::Hour),
            other => Err(EuroparlError::Configuration(format!(
                "unknown rate limit interval '{other}' (expected second, minute or hour)"
            ))),
        }
    }
}

/// Bucket state. `0 <= tokens <= capacity` at all times.
#[derive(Debug, Clone)]
pub struct RateLimitBucket {
    pub tokens: f64,
    pub capacity: f64,
    pub refill_interval: Duration,
    pub last_refill_at: Instant,
}

impl RateLimitBucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill_at);
        if self.refill_interval.is_zero() {
            self.tokens = self.capacity;
        } else {
            let credit = elapsed.as_secs_f64() / self.refill_interval.as_secs_f64() * self.capacity;
            self.tokens = (self.tokens + credit).min(self.capacity);
        }
        self.last_refill_at = now;
    }
}

/// Token-bucket rate limiter shared by every sub-client of one client.
pub struct RateLimiter {
    bucket: Mutex<RateLimitBucket>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// A full bucket of `capacity` tokens refilled once per `interval`.
    pub fn new(capacity: u32, interval: RateLimitInterval) -> Self {
        Self::with_clock(capacity, interval.as_duration(), Arc::new(SystemClock))
    }

    /// A full bucket with an arbitrary refill interval and clock.
    pub fn with_clock(capacity: u32, refill_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            bucket: Mutex::new(RateLimitBucket {
                tokens: f64::from(capacity),
                capacity: f64::from(capacity),
                refill_interval,
                last_refill_at: now,
            }),
            clock,
        }
    }

    /// Take `cost` tokens if available. Never blocks.
    ///
    /// A `cost` above capacity can never be satisfied and is always denied.
    pub fn try_acquire(&self, cost: u32) -> bool {
        let now = self.clock.now();
        let mut bucket = lock(&self.bucket);
        let cost = f64::from(cost);
        if cost > bucket.capacity {
            return false;
        }
        bucket.refill(now);
        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, after crediting the refill.
    pub fn available_tokens(&self) -> f64 {
        let now = self.clock.now();
        let mut bucket = lock(&self.bucket);
        bucket.refill(now);
        bucket.tokens
    }

    /// How long until `cost` tokens will be available.
    ///
    /// `Some(Duration::ZERO)` if they are available now, `None` if `cost`
    /// exceeds capacity.
    pub fn time_until_available(&self, cost: u32) -> Option<Duration> {
        let now = self.clock.now();
        let mut bucket = lock(&self.bucket);
        let cost = f64::from(cost);
        if cost > bucket.capacity {
            return None;
        }
        bucket.refill(now);
        let deficit = cost - bucket.tokens;
        if deficit <= 0.0 || bucket.capacity == 0.0 {
            return Some(Duration::ZERO);
        }
        let secs = deficit / bucket.capacity * bucket.refill_interval.as_secs_f64();
        Some(Duration::from_secs_f64(secs))
    }

    pub fn capacity(&self) -> u32 {
        lock(&self.bucket).capacity as u32
    }

    /// Copy of the current bucket state (without crediting a refill).
    pub fn snapshot(&self) -> RateLimitBucket {
        lock(&self.bucket).clone()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("bucket", &*lock(&self.bucket))
            .finish()
    }
}
