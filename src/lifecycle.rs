//! Request lifecycle coordination and graceful shutdown.
//!
//! A [`LifecycleCoordinator`] tracks every in-flight request and moves the
//! process through `Accepting -> Draining -> Stopped`. While draining, new
//! requests are rejected before they are counted or dispatched; requests
//! already in flight are given until the configured deadline to finish.
//!
//! The drain wait rides a `tokio::sync::watch` channel signaled on every
//! request completion, so shutdown wakes the moment the last request
//! finishes instead of sleep-polling a counter.
//!
//! Requests still running when the deadline elapses are NOT cancelled: the
//! coordinator logs how many were abandoned and proceeds to teardown. This
//! is deliberate best-effort semantics, and callers relying on the deadline
//! must not assume their handlers were interrupted.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;

const ACCEPTING: u8 = 0;
const DRAINING: u8 = 1;
const STOPPED: u8 = 2;

/// Where the coordinator is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Normal operation; requests are admitted and counted.
    Accepting,
    /// Shutdown requested; new requests are rejected, in-flight ones drain.
    Draining,
    /// Drain finished or deadline elapsed; teardown has run.
    Stopped,
}

/// How a drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight request completed within the deadline.
    Drained {
        /// How long the drain took.
        waited: Duration,
    },
    /// The deadline elapsed; this many requests were abandoned mid-flight.
    Forced {
        /// Requests still in flight when the coordinator gave up waiting.
        abandoned: u64,
    },
    /// Shutdown had already been initiated by another caller.
    AlreadyShuttingDown,
}

type ShutdownHook = Box<dyn FnOnce() + Send>;

/// Process-wide request admission and shutdown coordinator.
pub struct LifecycleCoordinator {
    state: AtomicU8,
    in_flight: watch::Sender<u64>,
    shutdown_timeout: Duration,
    hooks: Mutex<Vec<ShutdownHook>>,
}

impl std::fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("state", &self.state())
            .field("in_flight", &self.in_flight())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl LifecycleCoordinator {
    /// Create a coordinator with the given drain deadline.
    pub fn new(shutdown_timeout: Duration) -> Self {
        let (in_flight, _) = watch::channel(0u64);
        Self {
            state: AtomicU8::new(ACCEPTING),
            in_flight,
            shutdown_timeout,
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        match self.state.load(Ordering::SeqCst) {
            ACCEPTING => LifecycleState::Accepting,
            DRAINING => LifecycleState::Draining,
            _ => LifecycleState::Stopped,
        }
    }

    /// Whether new requests are currently admitted.
    pub fn is_accepting(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ACCEPTING
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> u64 {
        *self.in_flight.borrow()
    }

    /// Register a teardown callback to run after the drain completes.
    ///
    /// Hooks run in registration order. Each hook is isolated: one that
    /// panics is logged and skipped, and the remaining hooks still run.
    pub fn on_shutdown(&self, hook: impl FnOnce() + Send + 'static) {
        self.hooks.lock().push(Box::new(hook));
    }

    /// Admit a request, returning a guard that marks it complete on drop.
    ///
    /// Returns `None` once shutdown has begun: the request must be rejected
    /// without being dispatched, and is not counted toward the drain.
    pub fn begin_request(self: &Arc<Self>) -> Option<RequestGuard> {
        if !self.is_accepting() {
            return None;
        }
        self.in_flight.send_modify(|n| *n += 1);
        Some(RequestGuard {
            coordinator: Arc::clone(self),
        })
    }

    /// Drain in-flight requests and stop.
    ///
    /// Flips to `Draining`, waits for the in-flight count to reach zero or
    /// the deadline to elapse, then runs the registered shutdown hooks in
    /// order and moves to `Stopped`.
    pub async fn shutdown(&self) -> DrainOutcome {
        if self
            .state
            .compare_exchange(ACCEPTING, DRAINING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return DrainOutcome::AlreadyShuttingDown;
        }

        let started = Instant::now();
        tracing::info!(
            in_flight = self.in_flight(),
            "graceful shutdown initiated, draining in-flight requests"
        );

        let mut rx = self.in_flight.subscribe();
        let wait = rx.wait_for(|count| *count == 0);
        let outcome = match tokio::time::timeout(self.shutdown_timeout, wait).await {
            Ok(_) => DrainOutcome::Drained {
                waited: started.elapsed(),
            },
            Err(_) => {
                let abandoned = self.in_flight();
                if abandoned == 0 {
                    DrainOutcome::Drained {
                        waited: started.elapsed(),
                    }
                } else {
                    tracing::warn!(
                        abandoned,
                        "shutdown deadline elapsed with requests still in flight, forcing stop"
                    );
                    DrainOutcome::Forced { abandoned }
                }
            }
        };

        self.state.store(STOPPED, Ordering::SeqCst);
        self.run_hooks();
        tracing::info!("shutdown complete");
        outcome
    }

    fn run_hooks(&self) {
        let hooks: Vec<ShutdownHook> = std::mem::take(&mut *self.hooks.lock());
        for (index, hook) in hooks.into_iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(move || hook())).is_err() {
                tracing::warn!(index, "shutdown hook panicked, continuing with remaining hooks");
            }
        }
    }
}

/// RAII marker for one in-flight request.
///
/// Dropping the guard decrements the in-flight count and wakes a pending
/// drain, on every exit path: success, handler error, short-circuit, or
/// panic unwind.
pub struct RequestGuard {
    coordinator: Arc<LifecycleCoordinator>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.coordinator
            .in_flight
            .send_modify(|n| *n = n.saturating_sub(1));
    }
}
