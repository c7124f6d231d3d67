//! Rate limiting middleware.
//!
//! The route-decoration boundary of the limiter: attach one instance per
//! protected route (or share one scope across several routes) and it will
//! check the client's quota before the handler runs. The rate spec string is
//! parsed when the middleware is constructed, so a malformed spec fails at
//! startup, never on a live request.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use serde_json::json;

use crate::context::{RequestContext, Response};
use crate::error::{ConfigError, Result};
use crate::key::{KeyExtractor, RemoteAddrKey};
use crate::pipeline::{Middleware, Next};
use crate::rate::Rate;
use crate::registry::LimiterRegistry;

enum Cost {
    Fixed(u64),
    PerRequest(Arc<dyn Fn(&RequestContext) -> u64 + Send + Sync>),
}

/// Middleware enforcing a rate limit for one named scope.
pub struct RateLimitMiddleware {
    registry: Arc<LimiterRegistry>,
    scope: String,
    rate: Rate,
    key_extractor: Arc<dyn KeyExtractor>,
    cost: Cost,
    headers_enabled: bool,
    message: String,
    on_exceeded: Option<Arc<dyn Fn(&RequestContext) + Send + Sync>>,
}

impl RateLimitMiddleware {
    /// Create a limiter for `scope`, parsing a `"count/period"` rate spec.
    ///
    /// Fails with a [`ConfigError`] on a malformed spec so misconfiguration
    /// surfaces when the route is registered.
    pub fn new(
        registry: Arc<LimiterRegistry>,
        scope: impl Into<String>,
        rate_spec: &str,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self::with_rate(registry, scope, rate_spec.parse()?))
    }

    /// Create a limiter from an already-built [`Rate`].
    pub fn with_rate(registry: Arc<LimiterRegistry>, scope: impl Into<String>, rate: Rate) -> Self {
        Self {
            registry,
            scope: scope.into(),
            rate,
            key_extractor: Arc::new(RemoteAddrKey::new()),
            cost: Cost::Fixed(1),
            headers_enabled: true,
            message: "Rate limit exceeded".to_string(),
            on_exceeded: None,
        }
    }

    /// Replace the default remote-address key extractor.
    pub fn with_key_extractor(mut self, extractor: impl KeyExtractor + 'static) -> Self {
        self.key_extractor = Arc::new(extractor);
        self
    }

    /// Charge a fixed cost per request (default 1).
    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = Cost::Fixed(cost);
        self
    }

    /// Charge a per-request cost computed from the request.
    pub fn with_cost_fn(
        mut self,
        cost: impl Fn(&RequestContext) -> u64 + Send + Sync + 'static,
    ) -> Self {
        self.cost = Cost::PerRequest(Arc::new(cost));
        self
    }

    /// Custom denial message for the 429 payload.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Suppress the `X-RateLimit-*` response headers.
    pub fn without_headers(mut self) -> Self {
        self.headers_enabled = false;
        self
    }

    /// Observe denied requests (metrics, abuse tracking).
    pub fn with_on_exceeded(
        mut self,
        hook: impl Fn(&RequestContext) + Send + Sync + 'static,
    ) -> Self {
        self.on_exceeded = Some(Arc::new(hook));
        self
    }

    fn denied_response(&self, decision: &crate::decision::Decision) -> Response {
        let retry_secs = decision
            .info()
            .retry_after
            .map(|d| d.as_secs().max(1))
            .unwrap_or(60);

        let mut response = Response::json(
            &json!({
                "error": self.message,
                "limit": self.rate.count(),
                "retry_after": retry_secs,
            }),
            StatusCode::TOO_MANY_REQUESTS,
        );

        response.insert_header("retry-after", &retry_secs.to_string());
        if self.headers_enabled {
            decision.info().apply_to(&mut response);
        }
        response
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &'static str {
        "rate-limit"
    }

    async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response> {
        let client_key = self
            .key_extractor
            .extract(req)
            .unwrap_or_else(|| "unknown".to_string());

        let cost = match &self.cost {
            Cost::Fixed(cost) => *cost,
            Cost::PerRequest(f) => f(req),
        };

        let decision = self.registry.check(&client_key, &self.scope, &self.rate, cost);

        if decision.is_allowed() {
            let mut response = next.run(req).await?;
            if self.headers_enabled {
                decision.info().apply_to(&mut response);
            }
            return Ok(response);
        }

        if let Some(hook) = &self.on_exceeded {
            hook(req);
        }
        tracing::debug!(
            client = %client_key,
            scope = %self.scope,
            "rate limit exceeded"
        );
        Ok(self.denied_response(&decision))
    }
}
