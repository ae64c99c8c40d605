//! Raw byte forwarding to the upstream service.
//!
//! Bodies are streamed verbatim in both directions. The only header changes
//! are dropping hop-by-hop headers and replacing the request ID headers with
//! the ID carried by the request context.

use std::time::Instant;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, HeaderName, Method, StatusCode};
use reqid::{request_id_from_context, Context, RequestBuilderExt};
use reqid::{HEADER_CORRELATION_ID, HEADER_REQUEST_ID};
use tracing::Instrument;

/// Headers that should NOT be forwarded (hop-by-hop headers).
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "host",
    "connection",
    "transfer-encoding",
    "keep-alive",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Whether an inbound request header is copied onto the upstream request.
///
/// Request ID headers are re-set from the context, and reqwest derives
/// content-length from the buffered body.
fn should_forward(name: &HeaderName) -> bool {
    !is_hop_by_hop(name)
        && name != CONTENT_LENGTH
        && name != HEADER_REQUEST_ID
        && name != HEADER_CORRELATION_ID
}

/// Forward a request (any HTTP method) upstream and stream the response back.
pub async fn forward(
    client: &reqwest::Client,
    ctx: &Context,
    method: Method,
    url: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = request_id_from_context(ctx);
    let span = reqid_tracing::upstream_forward_span!(&request_id, &method, url);
    let start = Instant::now();

    async {
        let mut req_builder = client.request(method, url).body(body);

        // Forward non-hop-by-hop headers from the original request
        for (name, value) in headers.iter() {
            if should_forward(name) {
                req_builder = req_builder.header(name, value);
            }
        }

        let upstream_result = req_builder.propagate_request_id(ctx).send().await;

        build_response(upstream_result, start)
    }
    .instrument(span)
    .await
}

/// Build an axum Response from the upstream reqwest result, streaming the body back.
fn build_response(
    upstream_result: Result<reqwest::Response, reqwest::Error>,
    start: Instant,
) -> Response {
    let upstream_resp = match upstream_result {
        Ok(resp) => resp,
        Err(e) => {
            let latency = start.elapsed().as_millis() as u64;
            tracing::Span::current().record("latency_ms", latency);

            if e.is_timeout() {
                tracing::Span::current().record("status", 504_u16);
                tracing::error!(error = %e, "Upstream timeout");
                return (StatusCode::GATEWAY_TIMEOUT, "upstream timeout").into_response();
            }
            tracing::Span::current().record("status", 502_u16);
            tracing::error!(error = %e, "Upstream connection error");
            return (StatusCode::BAD_GATEWAY, "upstream connection error").into_response();
        }
    };

    let status = upstream_resp.status();
    let latency = start.elapsed().as_millis() as u64;
    tracing::Span::current().record("latency_ms", latency);
    tracing::Span::current().record("status", status.as_u16());

    tracing::info!(
        status = status.as_u16(),
        latency_ms = latency,
        "Forward complete"
    );

    let mut response_builder = Response::builder().status(status);

    // Forward response headers from upstream
    for (name, value) in upstream_resp.headers().iter() {
        if is_hop_by_hop(name) {
            continue;
        }
        response_builder = response_builder.header(name, value);
    }

    // Stream the body verbatim
    let body = Body::from_stream(upstream_resp.bytes_stream());

    response_builder.body(body).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build response");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    })
}
