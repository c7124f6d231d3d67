//! Request logging middleware.

use std::time::Instant;

use async_trait::async_trait;

use crate::context::{RequestContext, Response};
use crate::error::Result;
use crate::pipeline::{Middleware, Next};

/// Logs one line per request with status, method, path, and elapsed time.
///
/// Failures from inner layers are logged at warn level and propagated
/// untouched, so an error-handling middleware further out still sees them.
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Create a new logging middleware.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response> {
        let started = Instant::now();
        let method = req.method.clone();
        let path = req.path().to_string();
        let request_id = req.request_id.clone();

        match next.run(req).await {
            Ok(response) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                let status = response.status().as_u16();
                if status >= 500 {
                    tracing::warn!(%request_id, %method, %path, status, elapsed_ms, "request failed");
                } else {
                    tracing::info!(%request_id, %method, %path, status, elapsed_ms, "request completed");
                }
                Ok(response)
            }
            Err(err) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                tracing::warn!(%request_id, %method, %path, error = %err, elapsed_ms, "request errored");
                Err(err)
            }
        }
    }
}
