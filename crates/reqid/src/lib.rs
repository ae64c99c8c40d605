//! Request/correlation ID propagation across HTTP service boundaries.
//!
//! Inbound requests get an ID (reused from `X-Request-ID` / `X-Correlation-ID`
//! or freshly generated) via [`middleware::request_id_middleware`]. Handlers
//! hand it to business logic with [`context_from_request`], and outbound calls
//! carry it on with [`propagate_request_id`] or
//! [`RequestBuilderExt::propagate_request_id`].

pub mod config;
pub mod context;
pub mod error;
pub mod middleware;
pub mod propagate;
pub mod request;

pub use config::RequestIdConfig;
pub use context::{Context, ContextKey, ContextSource};
pub use error::InvalidRequestId;
pub use middleware::request_id_middleware;
pub use propagate::{
    context_from_request, context_with_request_id, generate_id, header_value,
    propagate_request_id, request_id, request_id_from_context, OutboundHeaders,
    RequestBuilderExt, HEADER_CORRELATION_ID, HEADER_REQUEST_ID, REQUEST_ID_KEY,
};
pub use request::RequestContext;
