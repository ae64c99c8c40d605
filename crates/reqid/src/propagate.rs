//! Request ID resolution and propagation.
//!
//! An ID found upstream (request context or generic context) is reused for
//! the whole causal chain. A fresh UUID v4 is generated only when nothing can
//! be resolved, so none of these functions can fail.

use http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use crate::context::{Context, ContextKey, ContextSource};
use crate::error::InvalidRequestId;
use crate::request::RequestContext;

/// Key under which the request ID is stored in a [`RequestContext`].
pub const REQUEST_ID_KEY: &str = "request_id";

/// Primary request ID header.
pub const HEADER_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation ID header, set to the same value as [`HEADER_REQUEST_ID`].
pub const HEADER_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

struct RequestIdKey;

impl ContextKey for RequestIdKey {
    type Value = String;
}

/// Generate a new request ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Request ID stored in the request context, or a freshly generated one.
///
/// A generated ID is not stored back.
pub fn request_id(req: &RequestContext) -> String {
    match req.get_string(REQUEST_ID_KEY) {
        "" => generate_id(),
        id => id.to_string(),
    }
}

/// Request ID carried by `ctx`, or a freshly generated one.
///
/// A [`RequestContext`] is resolved through [`request_id`]; any other source
/// is resolved through the value bound by [`context_with_request_id`].
pub fn request_id_from_context<C>(ctx: &C) -> String
where
    C: ContextSource + ?Sized,
{
    if let Some(req) = ctx.as_request_context() {
        return request_id(req);
    }

    match ctx.context().value::<RequestIdKey>() {
        Some(id) if !id.is_empty() => id.clone(),
        _ => generate_id(),
    }
}

/// Derive a child of `ctx` carrying `request_id`.
pub fn context_with_request_id(ctx: &Context, request_id: impl Into<String>) -> Context {
    ctx.with_value::<RequestIdKey>(request_id.into())
}

/// Hand-off from the request context to a generic context for downstream work.
///
/// The returned context is derived from the request's own context, so it keeps
/// the request deadline and cancellation.
pub fn context_from_request(req: &RequestContext) -> Context {
    let id = request_id(req);
    context_with_request_id(req.context(), id)
}

/// Convert a request ID into a header value.
pub fn header_value(id: &str) -> Result<HeaderValue, InvalidRequestId> {
    HeaderValue::from_str(id).map_err(|_| InvalidRequestId { id: id.to_string() })
}

/// Outbound request types whose headers can be rewritten.
pub trait OutboundHeaders {
    fn headers_mut(&mut self) -> &mut HeaderMap;
}

impl OutboundHeaders for HeaderMap {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self
    }
}

impl<B> OutboundHeaders for http::Request<B> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        http::Request::headers_mut(self)
    }
}

impl OutboundHeaders for reqwest::Request {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        reqwest::Request::headers_mut(self)
    }
}

/// Set `X-Request-ID` and `X-Correlation-ID` on `outbound` to the ID resolved
/// from `ctx`, replacing any existing values.
///
/// An ID that is not a valid header value leaves `outbound` untouched.
pub fn propagate_request_id<C, R>(ctx: &C, outbound: &mut R)
where
    C: ContextSource + ?Sized,
    R: OutboundHeaders + ?Sized,
{
    let id = request_id_from_context(ctx);
    let value = match header_value(&id) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping request id propagation");
            return;
        }
    };

    let headers = outbound.headers_mut();
    headers.insert(HEADER_REQUEST_ID, value.clone());
    headers.insert(HEADER_CORRELATION_ID, value);
}

/// Request ID propagation for `reqwest` request builders.
pub trait RequestBuilderExt: Sized {
    /// Add `X-Request-ID` and `X-Correlation-ID` resolved from `ctx`.
    fn propagate_request_id<C>(self, ctx: &C) -> Self
    where
        C: ContextSource + ?Sized;
}

impl RequestBuilderExt for reqwest::RequestBuilder {
    fn propagate_request_id<C>(self, ctx: &C) -> Self
    where
        C: ContextSource + ?Sized,
    {
        let id = request_id_from_context(ctx);
        match header_value(&id) {
            Ok(value) => self
                .header(HEADER_REQUEST_ID, value.clone())
                .header(HEADER_CORRELATION_ID, value),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping request id propagation");
                self
            }
        }
    }
}
