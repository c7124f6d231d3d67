//! CORS middleware.

use async_trait::async_trait;
use http::{Method, StatusCode};

use crate::context::{RequestContext, Response};
use crate::error::Result;
use crate::pipeline::{Middleware, Next};

/// Cross-origin resource sharing headers and preflight handling.
///
/// `OPTIONS` preflight requests short-circuit with a 204 carrying the CORS
/// headers; every other request runs the chain and gets the headers stamped
/// on its response.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    // None allows any origin.
    allow_origins: Option<Vec<String>>,
    allow_methods: Vec<String>,
    allow_headers: Vec<String>,
    expose_headers: Vec<String>,
    max_age: u64,
    allow_credentials: bool,
}

impl CorsMiddleware {
    /// Create a middleware allowing any origin with common defaults.
    pub fn new() -> Self {
        Self {
            allow_origins: None,
            allow_methods: ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allow_headers: ["Content-Type", "Authorization", "X-Requested-With"]
                .map(String::from)
                .to_vec(),
            expose_headers: Vec::new(),
            max_age: 86400,
            allow_credentials: false,
        }
    }

    /// Restrict to an explicit origin; call repeatedly to allow several.
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origins
            .get_or_insert_with(Vec::new)
            .push(origin.into());
        self
    }

    /// Expose a response header to browsers.
    pub fn expose_header(mut self, header: impl Into<String>) -> Self {
        self.expose_headers.push(header.into());
        self
    }

    /// Allow credentialed requests.
    pub fn allow_credentials(mut self) -> Self {
        self.allow_credentials = true;
        self
    }

    /// Preflight cache duration in seconds.
    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = max_age;
        self
    }

    fn resolve_origin(&self, request_origin: &str) -> Option<String> {
        match &self.allow_origins {
            None => Some("*".to_string()),
            Some(list) => list
                .iter()
                .find(|allowed| *allowed == request_origin)
                .cloned(),
        }
    }

    fn apply(&self, response: &mut Response, allowed_origin: Option<&str>) {
        if let Some(origin) = allowed_origin {
            response.insert_header("access-control-allow-origin", origin);
        }
        response.insert_header("access-control-allow-methods", &self.allow_methods.join(", "));
        response.insert_header("access-control-allow-headers", &self.allow_headers.join(", "));
        if !self.expose_headers.is_empty() {
            response.insert_header(
                "access-control-expose-headers",
                &self.expose_headers.join(", "),
            );
        }
        if self.allow_credentials {
            response.insert_header("access-control-allow-credentials", "true");
        }
        response.insert_header("access-control-max-age", &self.max_age.to_string());
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response> {
        let request_origin = req.header("origin").unwrap_or("").to_string();
        let allowed = self.resolve_origin(&request_origin);

        if req.method == Method::OPTIONS {
            let mut response = Response::new(StatusCode::NO_CONTENT);
            self.apply(&mut response, allowed.as_deref());
            return Ok(response);
        }

        let mut response = next.run(req).await?;
        self.apply(&mut response, allowed.as_deref());
        Ok(response)
    }
}
