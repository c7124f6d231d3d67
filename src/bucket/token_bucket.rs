//! Token bucket rate counting.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A refilling token bucket.
///
/// Tokens accrue at `refill_rate` per second up to `capacity`; each request
/// consumes `cost` tokens. Allows controlled bursts while enforcing an
/// average rate. All mutation happens inside one mutex so concurrent
/// consumers cannot both spend the same tokens.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<TokenState>,
}

#[derive(Debug)]
struct TokenState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket with the given capacity and refill rate
    /// (tokens per second).
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(TokenState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Refill from elapsed time, then consume `cost` tokens if available.
    ///
    /// The refill is persisted whether or not the consume succeeds; a failed
    /// consume leaves the token count otherwise untouched.
    pub fn consume(&self, cost: f64) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= cost {
            state.tokens -= cost;
            true
        } else {
            false
        }
    }

    /// Current token count including accrued refill.
    ///
    /// The projection is not persisted, so a subsequent [`consume`](Self::consume)
    /// computes its own refill from the unchanged `last_refill` and never
    /// double-counts elapsed time.
    pub fn remaining(&self) -> f64 {
        let state = self.state.lock();
        let elapsed = state.last_refill.elapsed().as_secs_f64();
        (state.tokens + elapsed * self.refill_rate).min(self.capacity)
    }

    /// How long until `cost` tokens will be available, or `None` if the cost
    /// can never be served (zero refill rate, or cost beyond capacity).
    pub fn time_to_available(&self, cost: f64) -> Option<Duration> {
        if cost > self.capacity {
            return None;
        }

        let available = self.remaining();
        if available >= cost {
            return Some(Duration::ZERO);
        }
        if self.refill_rate <= 0.0 {
            return None;
        }

        Some(Duration::from_secs_f64((cost - available) / self.refill_rate))
    }

    /// Maximum token capacity.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Time for an empty bucket to refill completely. Used as the window
    /// analogue when judging idleness. Falls back to one hour for
    /// non-refilling buckets.
    pub fn replenish_time(&self) -> Duration {
        if self.refill_rate > 0.0 {
            Duration::from_secs_f64(self.capacity / self.refill_rate)
        } else {
            Duration::from_secs(3600)
        }
    }

    /// Timestamp of the last consume attempt.
    pub fn last_activity(&self) -> Instant {
        self.state.lock().last_refill
    }
}
