//! Fixed window rate counting.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A counter that resets at fixed window boundaries.
///
/// Cheapest of the three algorithms: O(1) per hit with no timestamp log.
/// The cost is accuracy at boundaries: a client can land `limit` hits at the
/// end of one window and `limit` more at the start of the next. That
/// overshoot is part of the algorithm's contract.
#[derive(Debug)]
pub struct FixedWindowCounter {
    limit: u64,
    window: Duration,
    state: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    count: u64,
    window_start: Instant,
    last_hit: Instant,
}

impl FixedWindowCounter {
    /// Create a counter allowing `limit` hits per fixed `window`.
    pub fn new(limit: u64, window: Duration) -> Self {
        let now = Instant::now();
        Self {
            limit,
            window,
            state: Mutex::new(WindowState {
                count: 0,
                window_start: now,
                last_hit: now,
            }),
        }
    }

    fn roll_window(&self, state: &mut WindowState, now: Instant) {
        if now.duration_since(state.window_start) >= self.window {
            state.count = 0;
            state.window_start = now;
        }
    }

    /// Record `cost` hits if they fit within the current window's limit.
    pub fn hit(&self, cost: u64) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();
        self.roll_window(&mut state, now);

        if state.count.saturating_add(cost) <= self.limit {
            state.count += cost;
            state.last_hit = now;
            true
        } else {
            false
        }
    }

    /// Hits still available in the current window.
    pub fn remaining(&self) -> u64 {
        let state = self.state.lock();
        if state.window_start.elapsed() >= self.window {
            self.limit
        } else {
            self.limit.saturating_sub(state.count)
        }
    }

    /// Hits recorded in the current window; zero once the window has lapsed.
    pub fn count(&self) -> u64 {
        let state = self.state.lock();
        if state.window_start.elapsed() >= self.window {
            0
        } else {
            state.count
        }
    }

    /// End of the current window.
    pub fn reset_at(&self) -> Instant {
        self.state.lock().window_start + self.window
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_until_limit() {
        let counter = FixedWindowCounter::new(3, Duration::from_secs(60));

        assert!(counter.hit(1));
        assert!(counter.hit(1));
        assert!(counter.hit(1));
        assert!(!counter.hit(1));
        assert_eq!(counter.remaining(), 0);
    }

    #[test]
    fn test_window_resets_count() {
        let counter = FixedWindowCounter::new(2, Duration::from_millis(50));

        assert!(counter.hit(1));
        assert!(counter.hit(1));
        assert!(!counter.hit(1));

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(counter.count(), 0);
        assert_eq!(counter.remaining(), 2);
        assert!(counter.hit(1));
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_boundary_allows_double_limit() {
        let counter = FixedWindowCounter::new(2, Duration::from_millis(50));

        assert!(counter.hit(2));
        std::thread::sleep(Duration::from_millis(60));
        // New window: the full limit is available again immediately.
        assert!(counter.hit(2));
    }

    #[test]
    fn test_zero_cost_always_succeeds() {
        let counter = FixedWindowCounter::new(1, Duration::from_secs(60));
        assert!(counter.hit(1));
        assert!(counter.hit(0));
        assert_eq!(counter.remaining(), 0);
    }

    #[test]
    fn test_cost_above_limit_always_fails() {
        let counter = FixedWindowCounter::new(3, Duration::from_secs(60));
        assert!(!counter.hit(4));
        assert_eq!(counter.remaining(), 3);
    }

    #[test]
    fn test_reset_at_is_window_end() {
        let counter = FixedWindowCounter::new(3, Duration::from_secs(60));
        counter.hit(1);
        let reset = counter.reset_at();
        assert!(reset > Instant::now() + Duration::from_secs(59));
        assert!(reset <= Instant::now() + Duration::from_secs(60));
    }
}
