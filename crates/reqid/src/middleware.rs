//! axum middleware that assigns a request ID to every inbound request.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::HeaderMap;
use tracing::Instrument;

use crate::config::RequestIdConfig;
use crate::context::Context;
use crate::propagate::{generate_id, header_value, HEADER_REQUEST_ID, REQUEST_ID_KEY};
use crate::request::RequestContext;

/// Assign a request ID and install a [`RequestContext`] for handlers.
///
/// Install with `axum::middleware::from_fn_with_state(Arc::new(config), request_id_middleware)`.
///
/// 1. Reuse a caller-supplied ID when trusted and well-formed, else generate one
/// 2. Make sure the inbound request carries `X-Request-ID`
/// 3. Build the request context (cancellable, optional deadline)
/// 4. Run the inner service inside a `request` span
/// 5. Cancel the request context and echo `X-Request-ID` on the response
///
/// The request context is also cancelled when this future is dropped before
/// completing (client disconnect, outer timeout).
pub async fn request_id_middleware(
    State(config): State<Arc<RequestIdConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let inbound = if config.trust_inbound {
        inbound_request_id(request.headers(), &config)
    } else {
        None
    };
    let request_id = inbound.unwrap_or_else(generate_id);

    // Generated IDs are always valid header values; inbound ones were checked.
    if let Ok(value) = header_value(&request_id) {
        request.headers_mut().insert(HEADER_REQUEST_ID, value);
    }

    let (mut context, cancel) = Context::background().with_cancel();
    let cancel_guard = cancel.drop_guard();
    if let Some(secs) = config.request_timeout_secs {
        context = context.with_timeout(Duration::from_secs(secs));
    }

    let mut request_context = RequestContext::new(
        request.method().clone(),
        request.uri().clone(),
        request.headers().clone(),
        context,
    );
    request_context.set(REQUEST_ID_KEY, request_id.clone());
    request.extensions_mut().insert(request_context);

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    drop(cancel_guard);

    if config.echo_response {
        if let Ok(value) = header_value(&request_id) {
            response.headers_mut().insert(HEADER_REQUEST_ID, value);
        }
    }

    response
}

/// First acceptable ID among the configured inbound headers.
fn inbound_request_id(headers: &HeaderMap, config: &RequestIdConfig) -> Option<String> {
    config.inbound_headers.iter().find_map(|name| {
        let id = headers.get(name.as_str())?.to_str().ok()?.trim();
        if id.is_empty() || id.len() > config.max_inbound_len {
            tracing::debug!(header = %name, len = id.len(), "Ignoring inbound request id");
            return None;
        }
        Some(id.to_string())
    })
}
