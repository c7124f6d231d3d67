//! Request timeout middleware.

use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use serde_json::json;

use crate::context::{RequestContext, Response};
use crate::error::Result;
use crate::pipeline::{Middleware, Next};

/// Bounds the inner chain with a deadline.
///
/// An overrunning handler is abandoned (its future is dropped) and the
/// client receives a 504.
#[derive(Debug, Clone)]
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    /// Create a middleware with the given per-request deadline.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Middleware for TimeoutMiddleware {
    fn name(&self) -> &'static str {
        "timeout"
    }

    async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response> {
        let path = req.path().to_string();

        match tokio::time::timeout(self.timeout, next.run(req)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    %path,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "request timed out"
                );
                Ok(Response::json(
                    &json!({"error": "Request timed out"}),
                    StatusCode::GATEWAY_TIMEOUT,
                ))
            }
        }
    }
}
