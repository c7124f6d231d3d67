//! Built-in middleware.
//!
//! Each of these implements [`Middleware`](crate::pipeline::Middleware) and
//! composes in any order; applications are expected to mix them with their
//! own. The pipeline itself never interprets errors, so place
//! [`ErrorHandlerMiddleware`] outermost (or wherever error policy should
//! take effect) to turn propagated failures into responses.

mod cors;
mod error_handler;
mod logging;
mod rate_limit;
mod request_id;
mod security;
mod timeout;

pub use cors::CorsMiddleware;
pub use error_handler::ErrorHandlerMiddleware;
pub use logging::LoggingMiddleware;
pub use rate_limit::RateLimitMiddleware;
pub use request_id::RequestIdMiddleware;
pub use security::SecurityHeadersMiddleware;
pub use timeout::TimeoutMiddleware;
