//! Error handling middleware.

use async_trait::async_trait;
use serde_json::json;

use crate::context::{RequestContext, Response};
use crate::error::Result;
use crate::pipeline::{Middleware, Next};

/// Converts errors propagating out of inner layers into JSON responses.
///
/// The pipeline deliberately never interprets errors itself, so error policy
/// stays composable: place this middleware wherever the application wants
/// failures turned into responses, typically outermost.
#[derive(Debug, Clone, Default)]
pub struct ErrorHandlerMiddleware {
    debug: bool,
}

impl ErrorHandlerMiddleware {
    /// Create a middleware producing terse error payloads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include the error detail in payloads. Not for production responses.
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }
}

#[async_trait]
impl Middleware for ErrorHandlerMiddleware {
    fn name(&self) -> &'static str {
        "error-handler"
    }

    async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response> {
        match next.run(req).await {
            Ok(response) => Ok(response),
            Err(err) => {
                let status = err.status();
                tracing::error!(
                    request_id = %req.request_id,
                    error = %err,
                    status = status.as_u16(),
                    "request failed"
                );

                let reason = status.canonical_reason().unwrap_or("Error");
                let body = if self.debug {
                    json!({"error": reason, "detail": err.to_string()})
                } else {
                    json!({"error": reason})
                };
                Ok(Response::json(&body, status))
            }
        }
    }
}
