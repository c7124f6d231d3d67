//! Decision types for rate limit checks.
//!
//! A check produces a [`Decision`]: allowed or denied, plus the metadata a
//! response writer needs to emit rate-limit headers. Denial is a normal
//! value, not an error, so high-frequency denials stay cheap.

use std::time::{Duration, Instant};

use crate::context::Response;

/// Standard rate limit header names.
pub mod header_names {
    /// Maximum requests allowed per window.
    pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";

    /// Remaining requests in the current window.
    pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

    /// Seconds until the rate limit resets.
    pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

    /// Seconds until the client should retry (standard HTTP header).
    pub const RETRY_AFTER: &str = "retry-after";
}

/// The result of a rate limit check.
#[derive(Debug, Clone)]
pub struct Decision {
    allowed: bool,
    info: RateLimitInfo,
}

impl Decision {
    /// Create a new "allowed" decision.
    pub fn allowed(info: RateLimitInfo) -> Self {
        Self { allowed: true, info }
    }

    /// Create a new "denied" decision.
    pub fn denied(info: RateLimitInfo) -> Self {
        Self { allowed: false, info }
    }

    /// Check if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Check if the request is denied.
    pub fn is_denied(&self) -> bool {
        !self.allowed
    }

    /// Get the rate limit info.
    pub fn info(&self) -> &RateLimitInfo {
        &self.info
    }

    /// Consume the decision and return the info.
    pub fn into_info(self) -> RateLimitInfo {
        self.info
    }
}

/// Information about the current rate limit state.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Maximum requests allowed.
    pub limit: u64,
    /// Remaining requests in the current window.
    pub remaining: u64,
    /// When the rate limit resets. Token buckets have no window boundary
    /// and leave this unset.
    pub reset_at: Option<Instant>,
    /// How long to wait before retrying (only set when denied).
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    /// Create a new rate limit info.
    pub fn new(limit: u64, remaining: u64) -> Self {
        Self {
            limit,
            remaining,
            reset_at: None,
            retry_after: None,
        }
    }

    /// Set the reset timestamp.
    pub fn with_reset_at(mut self, reset_at: Instant) -> Self {
        self.reset_at = Some(reset_at);
        self
    }

    /// Set the retry-after duration.
    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    /// Seconds from now until the limit resets, if a reset time is known.
    pub fn reset_seconds(&self) -> Option<u64> {
        self.reset_at
            .map(|at| at.saturating_duration_since(Instant::now()).as_secs())
    }

    /// Convert to HTTP header pairs.
    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            (header_names::RATE_LIMIT_LIMIT, self.limit.to_string()),
            (header_names::RATE_LIMIT_REMAINING, self.remaining.to_string()),
        ];

        if let Some(reset) = self.reset_seconds() {
            headers.push((header_names::RATE_LIMIT_RESET, reset.to_string()));
        }

        if let Some(retry_after) = self.retry_after {
            headers.push((
                header_names::RETRY_AFTER,
                retry_after.as_secs().max(1).to_string(),
            ));
        }

        headers
    }

    /// Stamp the rate-limit headers onto a response.
    pub fn apply_to(&self, response: &mut Response) {
        for (name, value) in self.to_headers() {
            response.insert_header(name, &value);
        }
    }
}
