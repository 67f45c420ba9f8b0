//! Error types for the cache node's request path.
//!
//! Every failure a client can observe maps to exactly one HTTP status here.
//! Nothing is retried on the node's behalf; errors surface to the caller and
//! the next request re-resolves ownership from scratch.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request-path errors surfaced to clients.
#[derive(Error, Debug)]
pub enum NodeError {
    /// The `ttl` query parameter was present but not a whole number of seconds.
    #[error("invalid ttl: {0}")]
    InvalidTtl(String),

    /// The request body could not be read to completion.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// GET on a key this node owns but does not hold (absent or expired).
    #[error("key not found")]
    NotFound,

    /// The ring is empty or the owner has no registered address. Transient
    /// while discovery is still converging.
    #[error("no owner for key")]
    NoOwner,

    /// Forwarding to the owner failed before a response arrived.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// Forwarding to the owner exceeded the configured client timeout.
    #[error("upstream request timed out: {0}")]
    UpstreamTimeout(String),

    /// The owner resolved to this node after normalization even though the
    /// dispatch path decided to forward. Forwards are one hop; looping back
    /// is refused outright.
    #[error("refusing to forward to self")]
    ForwardLoop,

    /// Unsupported verb on the key endpoint.
    #[error("method not allowed")]
    MethodNotAllowed,
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = match &self {
            NodeError::InvalidTtl(_) => StatusCode::BAD_REQUEST,
            NodeError::BodyRead(_) => StatusCode::BAD_REQUEST,
            NodeError::NotFound => StatusCode::NOT_FOUND,
            NodeError::NoOwner => StatusCode::SERVICE_UNAVAILABLE,
            NodeError::Upstream(_) => StatusCode::BAD_GATEWAY,
            NodeError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            NodeError::ForwardLoop => StatusCode::INTERNAL_SERVER_ERROR,
            NodeError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
