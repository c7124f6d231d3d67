//! Integration tests for the middleware pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use parking_lot::Mutex;

use reqgate::{
    Error, ErrorHandlerMiddleware, FnHandler, LimiterRegistry, Middleware, Next, Pipeline,
    RateLimitMiddleware, RequestContext, Response, Result, Strategy, TimeoutMiddleware,
};

struct Tracer {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    call_next: bool,
}

#[async_trait]
impl Middleware for Tracer {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response> {
        self.log.lock().push(format!("{}-enter", self.name));
        if !self.call_next {
            return Ok(Response::text("stopped", StatusCode::FORBIDDEN));
        }
        let result = next.run(req).await;
        self.log.lock().push(format!("{}-exit", self.name));
        result
    }
}

fn tracer(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Tracer {
    Tracer {
        name,
        log: log.clone(),
        call_next: true,
    }
}

#[tokio::test]
async fn test_onion_ordering_through_three_layers() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new()
        .with(tracer("a", &log))
        .with(tracer("b", &log))
        .with(tracer("c", &log));

    let inner = log.clone();
    let handler = FnHandler::new(move |_req: &mut RequestContext| {
        inner.lock().push("handle".to_string());
        Ok(Response::text("ok", StatusCode::OK))
    });

    let mut req = RequestContext::get("/");
    pipeline.run(&mut req, &handler).await.unwrap();

    assert_eq!(
        *log.lock(),
        vec!["a-enter", "b-enter", "c-enter", "handle", "c-exit", "b-exit", "a-exit"]
    );
}

#[tokio::test]
async fn test_short_circuit_stops_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new()
        .with(tracer("a", &log))
        .with(Tracer {
            name: "b",
            log: log.clone(),
            call_next: false,
        })
        .with(tracer("c", &log));

    let inner = log.clone();
    let handler = FnHandler::new(move |_req: &mut RequestContext| {
        inner.lock().push("handle".to_string());
        Ok(Response::text("ok", StatusCode::OK))
    });

    let mut req = RequestContext::get("/");
    let response = pipeline.run(&mut req, &handler).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(*log.lock(), vec!["a-enter", "b-enter", "a-exit"]);
}

#[tokio::test]
async fn test_error_handler_converts_inner_failure() {
    let pipeline = Pipeline::new().with(ErrorHandlerMiddleware::new());
    let handler = FnHandler::new(|_req: &mut RequestContext| {
        Err(Error::Exhausted { resource: "connection pool" })
    });

    let mut req = RequestContext::get("/");
    let response = pipeline.run(&mut req, &handler).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_error_handler_sees_failures_from_deeper_middleware() {
    struct Exploding;

    #[async_trait]
    impl Middleware for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        async fn handle(&self, _req: &mut RequestContext, _next: Next<'_>) -> Result<Response> {
            Err(Error::Internal("deep failure".into()))
        }
    }

    let pipeline = Pipeline::new()
        .with(ErrorHandlerMiddleware::new().with_debug())
        .with(Exploding);
    let handler =
        FnHandler::new(|_req: &mut RequestContext| Ok(Response::text("ok", StatusCode::OK)));

    let mut req = RequestContext::get("/");
    let response = pipeline.run(&mut req, &handler).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert!(body["detail"].as_str().unwrap().contains("deep failure"));
}

#[tokio::test]
async fn test_rate_limit_inside_chain_short_circuits() {
    let registry = Arc::new(LimiterRegistry::new(Strategy::SlidingWindow));
    let log = Arc::new(Mutex::new(Vec::new()));

    let pipeline = Pipeline::new()
        .with(tracer("outer", &log))
        .with(RateLimitMiddleware::new(registry, "api", "1/minute").unwrap());

    let inner = log.clone();
    let handler = FnHandler::new(move |_req: &mut RequestContext| {
        inner.lock().push("handle".to_string());
        Ok(Response::text("ok", StatusCode::OK))
    });

    let mut req = RequestContext::get("/");
    req.remote_addr = Some("203.0.113.1".parse().unwrap());
    pipeline.run(&mut req, &handler).await.unwrap();

    let mut req = RequestContext::get("/");
    req.remote_addr = Some("203.0.113.1".parse().unwrap());
    let response = pipeline.run(&mut req, &handler).await.unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    // The handler ran once; the outer middleware unwound both times.
    assert_eq!(
        *log.lock(),
        vec!["outer-enter", "handle", "outer-exit", "outer-enter", "outer-exit"]
    );
}

#[tokio::test]
async fn test_timeout_bounds_slow_handler() {
    struct Stalling;

    #[async_trait]
    impl reqgate::Handler for Stalling {
        async fn call(&self, _req: &mut RequestContext) -> Result<Response> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Response::text("late", StatusCode::OK))
        }
    }

    let pipeline = Pipeline::new().with(TimeoutMiddleware::new(Duration::from_millis(50)));
    let mut req = RequestContext::get("/slow");
    let response = pipeline.run(&mut req, &Stalling).await.unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_middleware_mutations_visible_downstream() {
    struct Tagger;

    #[async_trait]
    impl Middleware for Tagger {
        fn name(&self) -> &'static str {
            "tagger"
        }

        async fn handle(&self, req: &mut RequestContext, next: Next<'_>) -> Result<Response> {
            req.metadata.insert("tenant".into(), "acme".into());
            next.run(req).await
        }
    }

    let pipeline = Pipeline::new().with(Tagger);
    let handler = FnHandler::new(|req: &mut RequestContext| {
        let tenant = req.metadata.get("tenant").cloned().unwrap_or_default();
        Ok(Response::text(tenant, StatusCode::OK))
    });

    let mut req = RequestContext::get("/");
    let response = pipeline.run(&mut req, &handler).await.unwrap();
    assert_eq!(response.body().as_ref(), b"acme");
}
