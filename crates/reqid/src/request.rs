//! Framework-side request context for axum handlers.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use http::header::AsHeaderName;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

use crate::context::{Context, ContextSource};

/// Per-request state visible to handlers.
///
/// Holds a snapshot of the inbound request line and headers, a string
/// key/value store for middleware-to-handler hand-off, and the request's own
/// [`Context`] (deadline and cancellation).
///
/// The request-id middleware installs one of these in the request extensions;
/// handlers receive it as an extractor.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    keys: HashMap<String, String>,
    context: Context,
}

impl RequestContext {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, context: Context) -> Self {
        Self {
            method,
            uri,
            headers,
            keys: HashMap::new(),
            context,
        }
    }

    /// Build from request parts over a background context.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(
            parts.method.clone(),
            parts.uri.clone(),
            parts.headers.clone(),
            Context::background(),
        )
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.keys.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    /// Value stored under `key`, or `""` when absent.
    pub fn get_string(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    /// Inbound header value, if present and valid visible ASCII.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request's own deadline/cancellation context.
    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl ContextSource for RequestContext {
    fn context(&self) -> &Context {
        &self.context
    }

    fn as_request_context(&self) -> Option<&RequestContext> {
        Some(self)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::from_parts(parts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(builder: http::request::Builder) -> Parts {
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_get_string_defaults_to_empty() {
        let mut req = RequestContext::from_parts(&parts(http::Request::builder().uri("/a")));
        assert_eq!(req.get_string("missing"), "");
        assert_eq!(req.get("missing"), None);

        req.set("user", "alice");
        assert_eq!(req.get_string("user"), "alice");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = RequestContext::from_parts(&parts(
            http::Request::builder()
                .method(Method::POST)
                .uri("/orders?id=3")
                .header("X-Request-ID", "abc-123"),
        ));

        assert_eq!(req.header("x-request-id"), Some("abc-123"));
        assert_eq!(req.header("X-REQUEST-ID"), Some("abc-123"));
        assert_eq!(req.header("x-correlation-id"), None);
        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.uri().path(), "/orders");
    }

    #[test]
    fn test_reports_itself_as_request_context() {
        let req = RequestContext::from_parts(&parts(http::Request::builder()));
        assert!(req.as_request_context().is_some());
        assert!(Context::background().as_request_context().is_none());
    }

    #[tokio::test]
    async fn test_extractor_prefers_installed_instance() {
        let mut installed = RequestContext::from_parts(&parts(http::Request::builder()));
        installed.set("request_id", "from-middleware");

        let mut p = parts(http::Request::builder());
        p.extensions.insert(installed);

        let extracted = RequestContext::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(extracted.get_string("request_id"), "from-middleware");
    }

    #[tokio::test]
    async fn test_extractor_falls_back_to_parts() {
        let mut p = parts(http::Request::builder().uri("/plain").header("x-trace", "t1"));

        let extracted = RequestContext::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(extracted.get_string("request_id"), "");
        assert_eq!(extracted.header("x-trace"), Some("t1"));
        assert_eq!(extracted.uri().path(), "/plain");
    }
}
