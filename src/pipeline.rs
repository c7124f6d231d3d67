//! Continuation-passing middleware pipeline.
//!
//! A [`Pipeline`] is an ordered, immutable chain of [`Middleware`] built
//! once at startup. Each middleware receives the request and a [`Next`]
//! continuation; calling the continuation runs the rest of the chain and
//! eventually the terminal [`Handler`], returning without calling it
//! short-circuits the chain.
//!
//! Execution follows the onion model: middleware run in registration order
//! on the way in, and code after the continuation call runs in reverse
//! registration order on the way out. Errors from inner layers propagate
//! unchanged through outer layers; the pipeline never intercepts or rewrites
//! them, so error policy lives in whatever error-handling middleware the
//! application places in the chain.
//!
//! [`Next::run`] takes the continuation by value, so invoking it a second
//! time is rejected at compile time rather than being a latent runtime bug.
//!
//! # Example
//!
//! ```ignore
//! use reqgate::{Pipeline, FnHandler, Response};
//! use http::StatusCode;
//!
//! let pipeline = Pipeline::new()
//!     .with(LoggingMiddleware::new())
//!     .with(SecurityHeadersMiddleware::new());
//!
//! let handler = FnHandler::new(|_req| Ok(Response::text("hello", StatusCode::OK)));
//! let response = pipeline.run(&mut req, &handler).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{RequestContext, Response};
use crate::error::Result;

/// A request interceptor in the pipeline.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Get the middleware name (for logging/metrics).
    fn name(&self) -> &'static str;

    /// Process the request, optionally invoking `next` to continue the
    /// chain. Returning without invoking `next` short-circuits: downstream
    /// middleware and the terminal handler never run, and this return value
    /// becomes the pipeline's result.
    async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response>;
}

/// A terminal request handler (route dispatch).
#[async_trait]
pub trait Handler: Send + Sync {
    /// Produce the response for the request.
    async fn call(&self, req: &mut RequestContext) -> Result<Response>;
}

/// Adapter turning a synchronous closure into a [`Handler`].
pub struct FnHandler<F> {
    handler: F,
}

impl<F> FnHandler<F> {
    /// Wrap a closure as a handler.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut RequestContext) -> Result<Response> + Send + Sync,
{
    async fn call(&self, req: &mut RequestContext) -> Result<Response> {
        (self.handler)(req)
    }
}

/// The continuation handed to each middleware.
///
/// Holds the not-yet-run tail of the chain plus the terminal handler.
/// [`run`](Self::run) consumes `self`: a middleware can invoke its
/// continuation at most once, enforced by the type system.
pub struct Next<'a> {
    stack: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Run the remainder of the chain and the terminal handler.
    pub async fn run(mut self, req: &mut RequestContext) -> Result<Response> {
        match self.stack.split_first() {
            Some((current, rest)) => {
                self.stack = rest;
                current.handle(req, self).await
            }
            None => self.endpoint.call(req).await,
        }
    }
}

/// An ordered middleware chain, built once and read-only per request.
#[derive(Default)]
pub struct Pipeline {
    stack: Vec<Arc<dyn Middleware>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("middleware", &self.names())
            .finish()
    }
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware to the chain.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.stack.push(Arc::new(middleware));
        self
    }

    /// Append an already-shared middleware to the chain.
    pub fn with_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.stack.push(middleware);
        self
    }

    /// Number of middleware in the chain.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Names of the middleware in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.stack.iter().map(|m| m.name()).collect()
    }

    /// Dispatch a request through the chain into the terminal handler.
    pub async fn run(&self, req: &mut RequestContext, endpoint: &dyn Handler) -> Result<Response> {
        Next {
            stack: &self.stack,
            endpoint,
        }
        .run(req)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use http::StatusCode;
    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response> {
            self.log.lock().push(format!("{}-enter", self.name));
            let result = next.run(req).await;
            self.log.lock().push(format!("{}-exit", self.name));
            result
        }
    }

    struct Blocker {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Blocker {
        fn name(&self) -> &'static str {
            "blocker"
        }

        async fn handle(&self, _req: &mut RequestContext, _next: Next<'_>) -> Result<Response> {
            self.log.lock().push("blocker-enter".to_string());
            Ok(Response::text("blocked", StatusCode::FORBIDDEN))
        }
    }

    struct Failing;

    #[async_trait]
    impl Middleware for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle(&self, _req: &mut RequestContext, _next: Next<'_>) -> Result<Response> {
            Err(Error::Internal("inner failure".into()))
        }
    }

    fn logging_handler(log: Arc<Mutex<Vec<String>>>) -> impl Handler {
        FnHandler::new(move |_req: &mut RequestContext| {
            log.lock().push("handle".to_string());
            Ok(Response::text("ok", StatusCode::OK))
        })
    }

    #[tokio::test]
    async fn test_onion_ordering() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with(Recorder { name: "a", log: log.clone() })
            .with(Recorder { name: "b", log: log.clone() })
            .with(Recorder { name: "c", log: log.clone() });

        let handler = logging_handler(log.clone());
        let mut req = RequestContext::get("/");
        let response = pipeline.run(&mut req, &handler).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *log.lock(),
            vec!["a-enter", "b-enter", "c-enter", "handle", "c-exit", "b-exit", "a-exit"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_downstream() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with(Recorder { name: "a", log: log.clone() })
            .with(Blocker { log: log.clone() })
            .with(Recorder { name: "c", log: log.clone() });

        let handler = logging_handler(log.clone());
        let mut req = RequestContext::get("/");
        let response = pipeline.run(&mut req, &handler).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        // c and the handler never ran; a still unwinds around the blocker.
        assert_eq!(*log.lock(), vec!["a-enter", "blocker-enter", "a-exit"]);
    }

    #[tokio::test]
    async fn test_errors_propagate_through_outer_layers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with(Recorder { name: "outer", log: log.clone() })
            .with(Failing);

        let handler = logging_handler(log.clone());
        let mut req = RequestContext::get("/");
        let result = pipeline.run(&mut req, &handler).await;

        assert!(matches!(result, Err(Error::Internal(_))));
        // The outer middleware observed the failure on its way out.
        assert_eq!(*log.lock(), vec!["outer-enter", "outer-exit"]);
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let pipeline = Pipeline::new();
        let handler = FnHandler::new(|_req: &mut RequestContext| {
            Err(Error::Exhausted { resource: "worker pool" })
        });

        let mut req = RequestContext::get("/");
        let result = pipeline.run(&mut req, &handler).await;
        assert!(matches!(result, Err(Error::Exhausted { .. })));
    }

    #[tokio::test]
    async fn test_empty_pipeline_calls_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new();
        let handler = logging_handler(log.clone());

        let mut req = RequestContext::get("/");
        pipeline.run(&mut req, &handler).await.unwrap();
        assert_eq!(*log.lock(), vec!["handle"]);
    }

    #[test]
    fn test_pipeline_names() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with(Recorder { name: "a", log: log.clone() })
            .with(Blocker { log });

        assert_eq!(pipeline.names(), vec!["a", "blocker"]);
        assert_eq!(pipeline.len(), 2);
    }
}
