//! HTTP client for backend calls.
//!
//! # Responsibilities
//! - Build GET requests for a backend URL
//! - Carry the request's [`TraceContext`] so the propagation layer can tag it
//! - Classify transport errors, non-2xx statuses and unreadable bodies
//!
//! # Design Decisions
//! - The trace layer is installed once at construction, never at call sites
//! - No timeouts or retries: a stalled backend stalls only its own request

use axum::{
    body::Body,
    http::{header, Method, Request, Uri},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::Value;
use tower::{Layer, ServiceExt};

use crate::downstream::{Backend, DownstreamError};
use crate::observability::propagation::{PropagateTrace, PropagateTraceLayer};
use crate::observability::trace_context::TraceContext;

type HttpClient = Client<HttpConnector, Body>;

const USER_AGENT: &str = concat!("bff-aggregator/", env!("CARGO_PKG_VERSION"));

/// Traced HTTP client shared by all requests.
#[derive(Clone)]
pub struct DownstreamClient {
    service: PropagateTrace<HttpClient>,
    max_body_bytes: usize,
}

impl DownstreamClient {
    pub fn new(max_body_bytes: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            service: PropagateTraceLayer.layer(client),
            max_body_bytes,
        }
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json(
        &self,
        backend: Backend,
        url: &str,
        ctx: &TraceContext,
    ) -> Result<Value, DownstreamError> {
        let uri = parse_backend_uri(backend, url)?;

        let mut request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())
            .map_err(|e| DownstreamError::InvalidUrl {
                backend,
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        request.extensions_mut().insert(ctx.clone());

        let response = self
            .service
            .clone()
            .oneshot(request)
            .await
            .map_err(|source| DownstreamError::Unavailable { backend, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownstreamError::Status { backend, status });
        }

        let bytes = axum::body::to_bytes(Body::new(response.into_body()), self.max_body_bytes)
            .await
            .map_err(|e| DownstreamError::Malformed {
                backend,
                reason: format!("unreadable body: {e}"),
            })?;

        serde_json::from_slice(&bytes).map_err(|e| DownstreamError::Malformed {
            backend,
            reason: e.to_string(),
        })
    }
}

/// The connector only speaks plain HTTP, so anything else fails before dialing.
fn parse_backend_uri(backend: Backend, url: &str) -> Result<Uri, DownstreamError> {
    let invalid = |reason: &str| DownstreamError::InvalidUrl {
        backend,
        url: url.to_string(),
        reason: reason.to_string(),
    };

    if url.is_empty() {
        return Err(invalid("not configured"));
    }
    let uri: Uri = url.parse().map_err(|e: axum::http::uri::InvalidUri| invalid(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => return Err(invalid(&format!("unsupported scheme '{other}'"))),
        None => return Err(invalid("missing scheme")),
    }
    if uri.host().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_url_is_invalid() {
        let err = parse_backend_uri(Backend::One, "").unwrap_err();
        assert!(matches!(err, DownstreamError::InvalidUrl { ref reason, .. } if reason == "not configured"));
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(parse_backend_uri(Backend::One, "https://backend1").is_err());
        assert!(parse_backend_uri(Backend::Two, "backend2:8080").is_err());
        assert!(parse_backend_uri(Backend::Two, "/relative").is_err());
        assert!(parse_backend_uri(Backend::Two, "http://exa mple").is_err());
    }

    #[test]
    fn test_accepts_plain_http() {
        let uri = parse_backend_uri(Backend::One, "http://backend1:8080/").unwrap();
        assert_eq!(uri.host(), Some("backend1"));
        assert_eq!(uri.port_u16(), Some(8080));
    }
}
