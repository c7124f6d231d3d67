//! Rate limiting, middleware, and graceful request lifecycle for Rust services.
//!
//! `reqgate` provides the concurrency-correct core of a web stack:
//!
//! - **Bucket Algorithms**: token bucket, sliding window, and fixed window
//!   counters, each an atomic check-then-commit under its own lock
//! - **Limiter Registry**: lazily-created buckets keyed by client and scope,
//!   with whitelist/blacklist, shared scopes, and idle-bucket sweeping
//! - **Middleware Pipeline**: continuation-passing onion-model chain where a
//!   middleware may short-circuit, mutate, or pass through
//! - **Lifecycle Coordinator**: in-flight request tracking with
//!   deadline-bounded graceful drain on shutdown
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use reqgate::{
//!     App, FnHandler, LimiterRegistry, RateLimitMiddleware, RequestContext, Response, Strategy,
//! };
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> reqgate::Result<()> {
//!     // Rate specs parse at registration; a bad spec fails startup.
//!     let registry = Arc::new(LimiterRegistry::new(Strategy::SlidingWindow));
//!     let limited = RateLimitMiddleware::new(registry.clone(), "api", "10/minute")?;
//!
//!     let app = App::builder().limiter(registry).middleware(limited).build();
//!
//!     let handler = FnHandler::new(|_req| Ok(Response::text("hello", StatusCode::OK)));
//!     let response = app.dispatch(RequestContext::get("/api"), &handler).await;
//!
//!     // On SIGTERM: reject new requests, drain in-flight ones.
//!     app.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Algorithms
//!
//! | Algorithm | Accuracy | Memory | Best For |
//! |-----------|----------|--------|----------|
//! | Token Bucket | High | O(1) | Bursty traffic |
//! | Sliding Window | Highest | O(hits) | Precision critical |
//! | Fixed Window | Low | O(1) | Cheap general limiting |
//!
//! One strategy is chosen per registry at construction and applied to every
//! scope uniformly.

pub mod app;
pub mod bucket;
pub mod context;
pub mod decision;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod middleware;
pub mod pipeline;
pub mod rate;
pub mod registry;

// Re-export main types
pub use app::{App, AppBuilder};
pub use bucket::{FixedWindowCounter, RateBucket, SlidingWindowCounter, Strategy, TokenBucket};
pub use context::{RequestContext, Response};
pub use decision::{Decision, RateLimitInfo};
pub use error::{ConfigError, Error, Result};
pub use key::{ApiKeyKey, FnKey, KeyExtractor, RemoteAddrKey};
pub use lifecycle::{DrainOutcome, LifecycleCoordinator, LifecycleState, RequestGuard};
pub use pipeline::{FnHandler, Handler, Middleware, Next, Pipeline};
pub use rate::Rate;
pub use registry::{BucketKey, LimiterRegistry, RegistryStats};

// Re-export built-in middleware
pub use middleware::{
    CorsMiddleware, ErrorHandlerMiddleware, LoggingMiddleware, RateLimitMiddleware,
    RequestIdMiddleware, SecurityHeadersMiddleware, TimeoutMiddleware,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::app::App;
    pub use crate::bucket::Strategy;
    pub use crate::context::{RequestContext, Response};
    pub use crate::decision::Decision;
    pub use crate::error::{Error, Result};
    pub use crate::key::{KeyExtractor, RemoteAddrKey};
    pub use crate::lifecycle::{DrainOutcome, LifecycleCoordinator};
    pub use crate::middleware::RateLimitMiddleware;
    pub use crate::pipeline::{FnHandler, Handler, Middleware, Next, Pipeline};
    pub use crate::rate::Rate;
    pub use crate::registry::LimiterRegistry;
}
