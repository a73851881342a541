//! Trace segment middleware.
//!
//! Opens a segment before route dispatch and closes it once the response is
//! produced, whatever the route or outcome. The [`TraceContext`] is inserted into
//! request extensions for handlers to pass to the downstream client.

use std::time::{Instant, SystemTime};

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use crate::observability::metrics;
use crate::observability::propagation::X_REQUEST_ID;
use crate::observability::segment::{HttpInfo, Tracer};
use crate::observability::trace_context::{IncomingContext, TraceContext, TRACEPARENT, X_AMZN_TRACE_ID};

pub async fn trace_segment(
    State(tracer): State<Tracer>,
    mut request: Request,
    next: Next,
) -> Response {
    let started_at = SystemTime::now();
    let start = Instant::now();

    let incoming = IncomingContext::from_headers(request.headers(), tracer.style());
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ctx = tracer.open(incoming, request_id);

    let method = request.method().clone();
    let url = segment_url(&request);
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    request.extensions_mut().insert(ctx.clone());

    let span = tracing::info_span!(
        "segment",
        name = %tracer.service_name(),
        trace_id = %ctx.trace_id(),
        segment_id = %ctx.segment_id(),
        request_id = ctx.request_id().unwrap_or("unknown"),
    );

    let mut response = next.run(request).instrument(span).await;
    let status = response.status();

    annotate_response(&mut response, &tracer, &ctx);
    tracer.close(
        &ctx,
        started_at,
        HttpInfo::new(method.as_str(), url, Some(status.as_u16())),
    );
    metrics::record_request(method.as_str(), &route, status.as_u16(), start);

    response
}

fn segment_url(request: &Request) -> String {
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    match request.headers().get(header::HOST).and_then(|v| v.to_str().ok()) {
        Some(host) => format!("http://{host}{path}"),
        None => request.uri().to_string(),
    }
}

/// Echo the trace back to the caller so it can be looked up.
fn annotate_response(response: &mut Response, tracer: &Tracer, ctx: &TraceContext) {
    let headers = response.headers_mut();
    if tracer.style().xray() {
        if let Ok(value) = HeaderValue::from_str(&format!("Root={}", ctx.trace_id().to_xray())) {
            headers.insert(X_AMZN_TRACE_ID, value);
        }
    }
    if tracer.style().w3c() {
        let traceparent = ctx
            .propagation_headers(ctx.segment_id())
            .into_iter()
            .find(|(name, _)| *name == TRACEPARENT);
        if let Some((name, value)) = traceparent {
            headers.insert(name, value);
        }
    }
}
