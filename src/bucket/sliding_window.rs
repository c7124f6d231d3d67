//! Sliding window rate counting.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// An exact trailing-window counter.
///
/// Keeps the timestamp of every hit inside the trailing window and purges
/// expired entries before each check. Purge, check, and commit run as one
/// critical section.
#[derive(Debug)]
pub struct SlidingWindowCounter {
    limit: u64,
    window: Duration,
    state: Mutex<HitLog>,
}

#[derive(Debug)]
struct HitLog {
    hits: VecDeque<Instant>,
    last_hit: Instant,
}

impl SlidingWindowCounter {
    /// Create a counter allowing `limit` hits per trailing `window`.
    pub fn new(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(HitLog {
                hits: VecDeque::new(),
                last_hit: Instant::now(),
            }),
        }
    }

    fn purge(&self, log: &mut HitLog, now: Instant) {
        while let Some(&front) = log.hits.front() {
            if now.duration_since(front) >= self.window {
                log.hits.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record `cost` hits if they fit within the limit.
    ///
    /// A zero cost always succeeds without mutating the log; a cost above
    /// the limit always fails, even against an empty window.
    pub fn hit(&self, cost: u64) -> bool {
        if cost == 0 {
            return true;
        }
        if cost > self.limit {
            return false;
        }

        let mut log = self.state.lock();
        let now = Instant::now();
        self.purge(&mut log, now);

        if log.hits.len() as u64 + cost <= self.limit {
            for _ in 0..cost {
                log.hits.push_back(now);
            }
            log.last_hit = now;
            true
        } else {
            false
        }
    }

    /// Hits still available in the current trailing window.
    pub fn remaining(&self) -> u64 {
        let mut log = self.state.lock();
        self.purge(&mut log, Instant::now());
        self.limit.saturating_sub(log.hits.len() as u64)
    }

    /// When the oldest retained hit leaves the window; a full window from
    /// now when the log is empty.
    pub fn reset_at(&self) -> Instant {
        let mut log = self.state.lock();
        let now = Instant::now();
        self.purge(&mut log, now);
        match log.hits.front() {
            Some(&oldest) => oldest + self.window,
            None => now + self.window,
        }
    }

    /// The configured window duration.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Timestamp of the most recent successful hit.
    pub fn last_activity(&self) -> Instant {
        self.state.lock().last_hit
    }
}
