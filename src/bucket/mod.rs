//! Rate-counting bucket primitives.
//!
//! Three interchangeable, lock-protected state machines track request rates:
//!
//! | Algorithm | Accuracy | Memory | Burst behavior |
//! |-----------|----------|--------|----------------|
//! | Token Bucket | High | O(1) | Smooth refill, allows bursts up to capacity |
//! | Sliding Window | Highest | O(n) hits | Exact trailing-window count |
//! | Fixed Window | Low | O(1) | Up to 2x limit across a window boundary |
//!
//! Each bucket guards its state with a single mutex so check-then-commit is
//! atomic under true parallelism: no two concurrent callers can both succeed
//! past the limit. The fixed window's boundary-straddling overshoot is an
//! accepted trade-off for its O(1) cost, not a bug.

mod fixed_window;
mod sliding_window;
mod token_bucket;

pub use fixed_window::FixedWindowCounter;
pub use sliding_window::SlidingWindowCounter;
pub use token_bucket::TokenBucket;

use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rate::Rate;

/// Bucket algorithm selector, fixed per registry at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Refilling token bucket.
    TokenBucket,
    /// Exact trailing-window hit log.
    SlidingWindow,
    /// Counter reset at fixed window boundaries.
    FixedWindow,
}

impl Strategy {
    /// Get the strategy name (for logging/metrics).
    pub fn name(&self) -> &'static str {
        match self {
            Self::TokenBucket => "token-bucket",
            Self::SlidingWindow => "sliding-window",
            Self::FixedWindow => "fixed-window",
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::SlidingWindow
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token-bucket" => Ok(Self::TokenBucket),
            "sliding-window" => Ok(Self::SlidingWindow),
            "fixed-window" => Ok(Self::FixedWindow),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// A per-key rate-tracking bucket, one of the three algorithm variants.
#[derive(Debug)]
pub enum RateBucket {
    /// Token bucket variant.
    TokenBucket(TokenBucket),
    /// Sliding window variant.
    SlidingWindow(SlidingWindowCounter),
    /// Fixed window variant.
    FixedWindow(FixedWindowCounter),
}

impl RateBucket {
    /// Build a bucket for the given strategy and rate.
    ///
    /// Token buckets derive `capacity = count` and refill at
    /// `count / window` tokens per second, matching the window semantics of
    /// the counter variants on average.
    pub fn new(strategy: Strategy, rate: &Rate) -> Self {
        match strategy {
            Strategy::TokenBucket => {
                Self::TokenBucket(TokenBucket::new(rate.count() as f64, rate.refill_rate()))
            }
            Strategy::SlidingWindow => {
                Self::SlidingWindow(SlidingWindowCounter::new(rate.count(), rate.window()))
            }
            Strategy::FixedWindow => {
                Self::FixedWindow(FixedWindowCounter::new(rate.count(), rate.window()))
            }
        }
    }

    /// Check-and-commit `cost` against the bucket. Atomic per bucket.
    pub fn acquire(&self, cost: u64) -> bool {
        match self {
            Self::TokenBucket(bucket) => bucket.consume(cost as f64),
            Self::SlidingWindow(counter) => counter.hit(cost),
            Self::FixedWindow(counter) => counter.hit(cost),
        }
    }

    /// Remaining capacity, without consuming anything.
    pub fn remaining(&self) -> u64 {
        match self {
            Self::TokenBucket(bucket) => bucket.remaining().floor().max(0.0) as u64,
            Self::SlidingWindow(counter) => counter.remaining(),
            Self::FixedWindow(counter) => counter.remaining(),
        }
    }

    /// When the next capacity frees up. Token buckets refill continuously
    /// and have no reset boundary.
    pub fn reset_at(&self) -> Option<Instant> {
        match self {
            Self::TokenBucket(_) => None,
            Self::SlidingWindow(counter) => Some(counter.reset_at()),
            Self::FixedWindow(counter) => Some(counter.reset_at()),
        }
    }

    /// How long a denied caller should wait before `cost` could succeed.
    pub fn retry_after(&self, cost: u64) -> Option<Duration> {
        match self {
            Self::TokenBucket(bucket) => bucket.time_to_available(cost as f64),
            Self::SlidingWindow(counter) => {
                Some(counter.reset_at().saturating_duration_since(Instant::now()))
            }
            Self::FixedWindow(counter) => {
                Some(counter.reset_at().saturating_duration_since(Instant::now()))
            }
        }
    }

    /// Timestamp of the most recent activity against this bucket.
    pub fn last_activity(&self) -> Instant {
        match self {
            Self::TokenBucket(bucket) => bucket.last_activity(),
            Self::SlidingWindow(counter) => counter.last_activity(),
            Self::FixedWindow(counter) => counter.last_activity(),
        }
    }

    /// Whether the bucket has been idle past twice its window and can be
    /// evicted from the registry map.
    pub fn is_idle(&self, now: Instant) -> bool {
        let window = match self {
            Self::TokenBucket(bucket) => bucket.replenish_time(),
            Self::SlidingWindow(counter) => counter.window(),
            Self::FixedWindow(counter) => counter.window(),
        };
        now.saturating_duration_since(self.last_activity()) > window * 2
    }

    /// Which strategy this bucket implements.
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::TokenBucket(_) => Strategy::TokenBucket,
            Self::SlidingWindow(_) => Strategy::SlidingWindow,
            Self::FixedWindow(_) => Strategy::FixedWindow,
        }
    }
}
