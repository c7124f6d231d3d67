//! Keyed registry of rate limit buckets.
//!
//! The registry owns every bucket in the process, keyed by
//! (client key, scope name). Buckets are created lazily on first use with
//! the registry's configured [`Strategy`] and evicted once idle, so
//! unbounded client-key cardinality cannot grow the map forever.
//!
//! Scopes are shared quotas: any number of routes may check against the same
//! scope name, and hits on any of them consume the one bucket a client has
//! for that scope.
//!
//! # Example
//!
//! ```ignore
//! use reqgate::{LimiterRegistry, Rate, Strategy};
//!
//! let registry = LimiterRegistry::new(Strategy::SlidingWindow);
//! registry.whitelist_key("10.0.0.1");
//!
//! let rate: Rate = "10/minute".parse()?;
//! let decision = registry.check("203.0.113.9", "api", &rate, 1);
//! if decision.is_denied() {
//!     // respond 429 with decision.info() headers
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dashmap::{DashMap, DashSet};
use serde::Serialize;

use crate::bucket::{RateBucket, Strategy};
use crate::decision::{Decision, RateLimitInfo};
use crate::rate::Rate;

/// Fallback retry hint when a bucket cannot say when capacity frees up.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Composite bucket identity: client key plus scope name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    /// The rate-limited principal (IP address, API key, user id).
    pub client: String,
    /// The named rate-limit domain, shared across routes.
    pub scope: String,
}

impl BucketKey {
    /// Create a new bucket key.
    pub fn new(client: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            scope: scope.into(),
        }
    }
}

/// Process-wide rate limiter shared by all request-handling tasks.
///
/// Map insertion is safe concurrently with lookups (`DashMap`); each
/// bucket's counters are additionally guarded by that bucket's own mutex,
/// so hits against one key are serialized while different keys proceed in
/// parallel.
pub struct LimiterRegistry {
    strategy: Strategy,
    buckets: DashMap<BucketKey, Arc<RateBucket>>,
    whitelist: DashSet<String>,
    blacklist: DashSet<String>,
    enabled: AtomicBool,
}

impl std::fmt::Debug for LimiterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterRegistry")
            .field("strategy", &self.strategy)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

impl Default for LimiterRegistry {
    fn default() -> Self {
        Self::new(Strategy::default())
    }
}

impl LimiterRegistry {
    /// Create a registry using the given bucket algorithm for every scope.
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            buckets: DashMap::new(),
            whitelist: DashSet::new(),
            blacklist: DashSet::new(),
            enabled: AtomicBool::new(true),
        }
    }

    /// The algorithm this registry applies.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Exempt a client key from rate limiting entirely.
    pub fn whitelist_key(&self, key: impl Into<String>) {
        self.whitelist.insert(key.into());
    }

    /// Deny a client key unconditionally.
    pub fn blacklist_key(&self, key: impl Into<String>) {
        self.blacklist.insert(key.into());
    }

    /// Enable or disable limiting at runtime. While disabled every check
    /// passes without touching any bucket.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether limiting is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Check and record a hit of `cost` for `client_key` against `scope`.
    ///
    /// Whitelisted keys are allowed without any bucket lookup or side
    /// effect; blacklisted keys are always denied. Otherwise the bucket for
    /// `(client_key, scope)` is created on first use with this registry's
    /// strategy and the given rate, and the hit is delegated to it.
    pub fn check(&self, client_key: &str, scope: &str, rate: &Rate, cost: u64) -> Decision {
        if !self.is_enabled() || self.whitelist.contains(client_key) {
            return Decision::allowed(RateLimitInfo::new(rate.count(), rate.count()));
        }

        if self.blacklist.contains(client_key) {
            return Decision::denied(RateLimitInfo::new(rate.count(), 0));
        }

        let bucket = self.bucket(client_key, scope, rate);
        let allowed = bucket.acquire(cost);

        let mut info = RateLimitInfo::new(rate.count(), bucket.remaining());
        if let Some(reset_at) = bucket.reset_at() {
            info = info.with_reset_at(reset_at);
        }

        if allowed {
            Decision::allowed(info)
        } else {
            let retry_after = bucket.retry_after(cost).unwrap_or(DEFAULT_RETRY_AFTER);
            Decision::denied(info.with_retry_after(retry_after))
        }
    }

    fn bucket(&self, client_key: &str, scope: &str, rate: &Rate) -> Arc<RateBucket> {
        self.buckets
            .entry(BucketKey::new(client_key, scope))
            .or_insert_with(|| Arc::new(RateBucket::new(self.strategy, rate)))
            .clone()
    }

    /// Drop buckets whose most recent activity is older than twice their
    /// window. Returns the number of buckets removed.
    pub fn purge_idle(&self) -> usize {
        let before = self.buckets.len();
        let now = Instant::now();
        self.buckets.retain(|_, bucket| !bucket.is_idle(now));
        before.saturating_sub(self.buckets.len())
    }

    /// Spawn a background task that purges idle buckets every `interval`.
    ///
    /// The task holds only a weak reference: dropping the last `Arc` to the
    /// registry ends the sweeper on its next tick.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let removed = registry.purge_idle();
                if removed > 0 {
                    tracing::debug!(removed, "purged idle rate limit buckets");
                }
            }
        })
    }

    /// Drop all buckets.
    pub fn reset(&self) {
        self.buckets.clear();
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the registry holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Snapshot of registry state for diagnostics endpoints.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_buckets: self.buckets.len(),
            strategy: self.strategy,
            whitelisted: self.whitelist.len(),
            blacklisted: self.blacklist.len(),
        }
    }
}

/// Point-in-time registry statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    /// Live bucket count.
    pub total_buckets: usize,
    /// Configured algorithm.
    pub strategy: Strategy,
    /// Whitelisted key count.
    pub whitelisted: usize,
    /// Blacklisted key count.
    pub blacklisted: usize,
}
