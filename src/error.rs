//! Error types for the request-gating core.
//!
//! Configuration problems are surfaced at setup time and are fatal to
//! startup. Rate-limit denial is deliberately NOT represented here: a denied
//! check is a normal [`Decision`](crate::decision::Decision) value so the
//! hot path never pays error-handling cost for high-frequency denials.

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// Result type for request-gating operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error; raised at registration time, never per request.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Client key extraction failed.
    #[error("Key extraction failed: {0}")]
    KeyExtraction(String),

    /// A dependent resource (worker pool, connection pool, queue) has no
    /// capacity left. Reported explicitly, never dropped.
    #[error("{resource} exhausted")]
    Exhausted {
        /// Name of the exhausted resource.
        resource: &'static str,
    },

    /// An inner handler or middleware exceeded its time budget.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The HTTP status an error-handling middleware should emit for this
    /// error when nothing downstream consumed it.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Exhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) | Self::KeyExtraction(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Configuration-related errors.
///
/// These must surface when routes are registered so that a misconfigured
/// deployment fails immediately at startup instead of at request time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Rate spec string is not of the form `count/period`.
    #[error("Invalid rate format: '{0}'. Use 'count/period' like '10/minute'")]
    InvalidRate(String),

    /// Rate spec period is not a known time unit.
    #[error("Unknown time period: '{0}'. Use second/minute/hour/day")]
    UnknownPeriod(String),

    /// Strategy name is not a known bucket algorithm.
    #[error("Unknown rate limit strategy: '{0}'. Use token-bucket/sliding-window/fixed-window")]
    UnknownStrategy(String),

    /// Numeric limit parameters are out of range.
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Missing required configuration.
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
