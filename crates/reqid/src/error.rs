//! Error types.

/// A request ID that cannot be carried in an HTTP header.
#[derive(Debug, thiserror::Error)]
#[error("request id {id:?} is not a valid header value")]
pub struct InvalidRequestId {
    pub id: String,
}
