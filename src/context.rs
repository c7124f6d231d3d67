//! Request and response envelope types.
//!
//! The pipeline, key extractors, and built-in middleware operate on these
//! concrete types; embedding servers adapt their native request objects into
//! a [`RequestContext`] and write the returned [`Response`] back out.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use serde::Serialize;
use uuid::Uuid;

/// Per-request state threaded through the middleware pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request id taken from the inbound `x-request-id` header, or generated.
    pub request_id: String,
    /// HTTP method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
    /// Peer address as seen by the listener, before any proxy override.
    pub remote_addr: Option<IpAddr>,
    /// When the request entered the pipeline.
    pub started_at: Instant,
    /// Scratch space for middleware to pass values downstream.
    pub metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        remote_addr: Option<IpAddr>,
    ) -> Self {
        let request_id = headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            request_id,
            method,
            uri,
            headers,
            body,
            remote_addr,
            started_at: Instant::now(),
            metadata: HashMap::new(),
        }
    }

    /// Convenience constructor for a bare GET request.
    pub fn get(path: &str) -> Self {
        Self::new(
            Method::GET,
            path.parse().unwrap_or_else(|_| Uri::from_static("/")),
            HeaderMap::new(),
            Bytes::new(),
            None,
        )
    }

    /// The request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// A header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Insert a header, ignoring invalid names or values.
    pub fn insert_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
    }
}

/// An HTTP response produced by a handler or middleware.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a JSON response from a serializable value.
    pub fn json<T: Serialize>(value: &T, status: StatusCode) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                let mut response = Self::new(status);
                response.insert_header("content-type", "application/json");
                response.body = Bytes::from(body);
                response
            }
            Err(err) => {
                let mut response = Self::new(StatusCode::INTERNAL_SERVER_ERROR);
                response.insert_header("content-type", "text/plain; charset=utf-8");
                response.body = Bytes::from(format!("serialization failed: {err}"));
                response
            }
        }
    }

    /// Create a plain-text response.
    pub fn text(content: impl Into<String>, status: StatusCode) -> Self {
        let mut response = Self::new(status);
        response.insert_header("content-type", "text/plain; charset=utf-8");
        response.body = Bytes::from(content.into());
        response
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set the response status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// A response header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Insert a header, ignoring invalid names or values.
    pub fn insert_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
    }

    /// Builder-style header insertion.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.insert_header(name, value);
        self
    }

    /// Response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replace the response body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc-123"));
        let req = RequestContext::new(
            Method::GET,
            Uri::from_static("/api/data"),
            headers,
            Bytes::new(),
            None,
        );

        assert_eq!(req.request_id, "abc-123");
        assert_eq!(req.path(), "/api/data");
    }

    #[test]
    fn test_request_id_generated() {
        let a = RequestContext::get("/");
        let b = RequestContext::get("/");
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn test_json_response() {
        let response = Response::json(&json!({"ok": true}), StatusCode::OK);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.body().as_ref(), br#"{"ok":true}"#);
    }

    #[test]
    fn test_insert_header_ignores_invalid() {
        let mut response = Response::default();
        response.insert_header("x-valid", "yes");
        response.insert_header("bad header name", "value");

        assert_eq!(response.header("x-valid"), Some("yes"));
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn test_text_response() {
        let response = Response::text("Forbidden", StatusCode::FORBIDDEN);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.body().as_ref(), b"Forbidden");
    }
}
