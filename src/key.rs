//! Client key extraction for rate limiting.
//!
//! The key determines how requests are grouped: all requests sharing a key
//! share a quota. Extractors return `None` when no key can be derived, which
//! callers typically treat as fail-open.

use std::sync::Arc;

use crate::context::RequestContext;

/// Trait for extracting rate limiting keys from requests.
pub trait KeyExtractor: Send + Sync {
    /// Extract a rate limiting key from the request.
    fn extract(&self, request: &RequestContext) -> Option<String>;

    /// Get the extractor name (for logging/metrics).
    fn name(&self) -> &'static str;
}

impl<K: KeyExtractor + ?Sized> KeyExtractor for Arc<K> {
    fn extract(&self, request: &RequestContext) -> Option<String> {
        (**self).extract(request)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Key by client network address.
///
/// Checks `X-Forwarded-For` (first entry) and `X-Real-IP` before falling
/// back to the peer address, so clients behind a reverse proxy are keyed by
/// their real address.
#[derive(Debug, Clone, Default)]
pub struct RemoteAddrKey;

impl RemoteAddrKey {
    /// Create a new remote-address key extractor.
    pub fn new() -> Self {
        Self
    }
}

impl KeyExtractor for RemoteAddrKey {
    fn extract(&self, request: &RequestContext) -> Option<String> {
        if let Some(forwarded) = request.header("x-forwarded-for") {
            let first = forwarded.split(',').next()?.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }

        if let Some(real_ip) = request.header("x-real-ip") {
            let trimmed = real_ip.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }

        request.remote_addr.map(|ip| ip.to_string())
    }

    fn name(&self) -> &'static str {
        "remote_addr"
    }
}

/// Key by API key header, falling back to the client address for anonymous
/// requests.
#[derive(Debug, Clone)]
pub struct ApiKeyKey {
    header: &'static str,
}

impl ApiKeyKey {
    /// Create an extractor reading the `X-Api-Key` header.
    pub fn new() -> Self {
        Self { header: "x-api-key" }
    }

    /// Create an extractor reading a custom header.
    pub fn with_header(header: &'static str) -> Self {
        Self { header }
    }
}

impl Default for ApiKeyKey {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyExtractor for ApiKeyKey {
    fn extract(&self, request: &RequestContext) -> Option<String> {
        if let Some(key) = request.header(self.header).filter(|v| !v.is_empty()) {
            return Some(key.to_string());
        }
        RemoteAddrKey.extract(request)
    }

    fn name(&self) -> &'static str {
        "api_key"
    }
}

/// A function-based key extractor for application-defined grouping.
#[derive(Clone)]
pub struct FnKey<F> {
    extractor: F,
    name: &'static str,
}

impl<F> std::fmt::Debug for FnKey<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnKey").field("name", &self.name).finish()
    }
}

impl<F> FnKey<F> {
    /// Create a new function-based key extractor.
    pub fn new(name: &'static str, extractor: F) -> Self {
        Self { extractor, name }
    }
}

impl<F> KeyExtractor for FnKey<F>
where
    F: Fn(&RequestContext) -> Option<String> + Send + Sync,
{
    fn extract(&self, request: &RequestContext) -> Option<String> {
        (self.extractor)(request)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
