//! Security headers middleware.

use async_trait::async_trait;

use crate::context::{RequestContext, Response};
use crate::error::Result;
use crate::pipeline::{Middleware, Next};

const DEFAULT_HSTS_MAX_AGE: u64 = 31_536_000;

/// Stamps standard security headers on every response.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeadersMiddleware {
    csp: Option<String>,
    hsts_max_age: Option<u64>,
}

impl SecurityHeadersMiddleware {
    /// Create a middleware with the baseline header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `Content-Security-Policy` header.
    pub fn with_csp(mut self, csp: impl Into<String>) -> Self {
        self.csp = Some(csp.into());
        self
    }

    /// Add a `Strict-Transport-Security` header with a one-year max age.
    pub fn with_hsts(mut self) -> Self {
        self.hsts_max_age = Some(DEFAULT_HSTS_MAX_AGE);
        self
    }

    /// Add a `Strict-Transport-Security` header with a custom max age.
    pub fn with_hsts_max_age(mut self, max_age: u64) -> Self {
        self.hsts_max_age = Some(max_age);
        self
    }
}

#[async_trait]
impl Middleware for SecurityHeadersMiddleware {
    fn name(&self) -> &'static str {
        "security-headers"
    }

    async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response> {
        let mut response = next.run(req).await?;

        response.insert_header("x-content-type-options", "nosniff");
        response.insert_header("x-frame-options", "DENY");
        response.insert_header("x-xss-protection", "1; mode=block");
        response.insert_header("referrer-policy", "strict-origin-when-cross-origin");
        response.insert_header(
            "permissions-policy",
            "camera=(), microphone=(), geolocation=()",
        );

        if let Some(csp) = &self.csp {
            response.insert_header("content-security-policy", csp);
        }
        if let Some(max_age) = self.hsts_max_age {
            response.insert_header(
                "strict-transport-security",
                &format!("max-age={max_age}; includeSubDomains"),
            );
        }

        Ok(response)
    }
}
