//! Downstream failure taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::downstream::Backend;

/// Why a downstream stage failed. Every variant becomes a `502 Bad Gateway`.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("{backend} URL '{url}' is not usable: {reason}")]
    InvalidUrl {
        backend: Backend,
        url: String,
        reason: String,
    },

    #[error("{backend} unavailable: {source}")]
    Unavailable {
        backend: Backend,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("{backend} returned status {status}")]
    Status { backend: Backend, status: StatusCode },

    #[error("{backend} returned a malformed payload: {reason}")]
    Malformed { backend: Backend, reason: String },
}

impl DownstreamError {
    pub fn backend(&self) -> Backend {
        match self {
            DownstreamError::InvalidUrl { backend, .. }
            | DownstreamError::Unavailable { backend, .. }
            | DownstreamError::Status { backend, .. }
            | DownstreamError::Malformed { backend, .. } => *backend,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DownstreamError::InvalidUrl { .. } => "invalid_url",
            DownstreamError::Unavailable { .. } => "unavailable",
            DownstreamError::Status { .. } => "status",
            DownstreamError::Malformed { .. } => "malformed",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    backend: &'static str,
    message: String,
}

impl IntoResponse for DownstreamError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: "bad_gateway",
            backend: self.backend().label(),
            message: self.to_string(),
        };
        (StatusCode::BAD_GATEWAY, Json(body)).into_response()
    }
}
