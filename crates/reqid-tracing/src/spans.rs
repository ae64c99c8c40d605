//! Span builder helpers for reqid-relay instrumentation.

/// Create a tracing span for a forward to the upstream service.
///
/// Usage: `let span = upstream_forward_span!(request_id, method, url);`
///
/// Fields recorded once the upstream answers:
/// - `status`: upstream HTTP status, or 502/504 on transport failure
/// - `latency_ms`: milliseconds from send to response headers
#[macro_export]
macro_rules! upstream_forward_span {
    ($request_id:expr, $method:expr, $target:expr) => {
        tracing::info_span!(
            "upstream_forward",
            request_id = %$request_id,
            method = %$method,
            target = %$target,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    };
}
