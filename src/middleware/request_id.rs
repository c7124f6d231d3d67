//! Request id middleware.

use async_trait::async_trait;
use uuid::Uuid;

use crate::context::{RequestContext, Response};
use crate::error::Result;
use crate::pipeline::{Middleware, Next};

/// Assigns each request an id and echoes it on the response.
///
/// Honors an id supplied by the client (or an upstream proxy) in the
/// configured header; generates a UUID otherwise.
#[derive(Debug, Clone)]
pub struct RequestIdMiddleware {
    header: &'static str,
}

impl RequestIdMiddleware {
    /// Create a middleware using the `X-Request-ID` header.
    pub fn new() -> Self {
        Self { header: "x-request-id" }
    }

    /// Create a middleware using a custom header.
    pub fn with_header(header: &'static str) -> Self {
        Self { header }
    }
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request-id"
    }

    async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response> {
        let id = req
            .header(self.header)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        req.request_id = id.clone();

        let mut response = next.run(req).await?;
        response.insert_header(self.header, &id);
        Ok(response)
    }
}
