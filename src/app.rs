//! Application context wiring the core together.
//!
//! [`App`] replaces process-wide singletons with one explicit struct holding
//! the limiter registry, the middleware pipeline, and the lifecycle
//! coordinator. Embedding servers hand it each inbound request via
//! [`App::dispatch`], which runs the admission hook, the pipeline, and the
//! guaranteed completion hook around the route handler.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use parking_lot::Mutex;
use serde_json::json;

use crate::bucket::Strategy;
use crate::context::{RequestContext, Response};
use crate::lifecycle::{DrainOutcome, LifecycleCoordinator};
use crate::pipeline::{Handler, Middleware, Pipeline};
use crate::registry::LimiterRegistry;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

type StartupHook = Box<dyn FnOnce() + Send>;

/// The application context: limiter, pipeline, and lifecycle in one place.
pub struct App {
    pipeline: Pipeline,
    limiter: Arc<LimiterRegistry>,
    lifecycle: Arc<LifecycleCoordinator>,
    startup_hooks: Mutex<Vec<StartupHook>>,
}

impl App {
    /// Start building an application context.
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// The shared limiter registry.
    pub fn limiter(&self) -> &Arc<LimiterRegistry> {
        &self.limiter
    }

    /// The lifecycle coordinator, for wiring signal handlers.
    pub fn lifecycle(&self) -> &Arc<LifecycleCoordinator> {
        &self.lifecycle
    }

    /// The middleware pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Register a hook to run once when the application starts.
    pub fn on_startup(&self, hook: impl FnOnce() + Send + 'static) {
        self.startup_hooks.lock().push(Box::new(hook));
    }

    /// Register a teardown hook; see
    /// [`LifecycleCoordinator::on_shutdown`]. Dependent resources register
    /// here in the order they should be torn down.
    pub fn on_shutdown(&self, hook: impl FnOnce() + Send + 'static) {
        self.lifecycle.on_shutdown(hook);
    }

    /// Run the registered startup hooks, in registration order.
    pub fn start(&self) {
        let hooks: Vec<StartupHook> = std::mem::take(&mut *self.startup_hooks.lock());
        for hook in hooks {
            hook();
        }
    }

    /// Dispatch one request through the pipeline into `endpoint`.
    ///
    /// While draining, responds 503 with a connection-close hint without
    /// counting or dispatching the request. Errors that no error-handling
    /// middleware consumed are logged here and mapped to their status, so
    /// the embedding server always gets a response to write.
    pub async fn dispatch(&self, mut req: RequestContext, endpoint: &dyn Handler) -> Response {
        let Some(_guard) = self.lifecycle.begin_request() else {
            return Response::json(
                &json!({"error": "Server is shutting down"}),
                StatusCode::SERVICE_UNAVAILABLE,
            )
            .with_header("connection", "close");
        };

        match self.pipeline.run(&mut req, endpoint).await {
            Ok(response) => response,
            Err(err) => {
                let status = err.status();
                tracing::error!(
                    request_id = %req.request_id,
                    error = %err,
                    "unhandled error reached dispatch"
                );
                Response::json(
                    &json!({"error": status.canonical_reason().unwrap_or("Error")}),
                    status,
                )
            }
        }
    }

    /// Drain in-flight requests and run teardown.
    pub async fn shutdown(&self) -> DrainOutcome {
        self.lifecycle.shutdown().await
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("pipeline", &self.pipeline)
            .field("limiter", &self.limiter)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

/// Builder for [`App`].
pub struct AppBuilder {
    strategy: Strategy,
    shutdown_timeout: Duration,
    pipeline: Pipeline,
    limiter: Option<Arc<LimiterRegistry>>,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    /// Create a builder with a sliding-window limiter and a 30 second
    /// shutdown deadline.
    pub fn new() -> Self {
        Self {
            strategy: Strategy::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            pipeline: Pipeline::new(),
            limiter: None,
        }
    }

    /// Select the bucket algorithm for the limiter registry.
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Share an existing limiter registry instead of creating one.
    ///
    /// Rate-limit middleware is usually built against the same registry the
    /// app exposes; construct the registry first, hand clones to the
    /// middleware, and pass it here. Overrides [`strategy`](Self::strategy).
    pub fn limiter(mut self, limiter: Arc<LimiterRegistry>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Set the graceful shutdown deadline.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Append a middleware to the pipeline.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.pipeline = self.pipeline.with(middleware);
        self
    }

    /// Replace the pipeline wholesale.
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Build the application context.
    pub fn build(self) -> App {
        let limiter = self
            .limiter
            .unwrap_or_else(|| Arc::new(LimiterRegistry::new(self.strategy)));
        App {
            pipeline: self.pipeline,
            limiter,
            lifecycle: Arc::new(LifecycleCoordinator::new(self.shutdown_timeout)),
            startup_hooks: Mutex::new(Vec::new()),
        }
    }
}
