//! Outbound trace propagation.
//!
//! [`PropagateTraceLayer`] wraps an HTTP client service. Any request carrying a
//! [`TraceContext`] extension gets a fresh subsegment id, the trace headers and
//! the request id; when the call finishes a [`Subsegment`] is recorded on the
//! context. Requests without a context pass through untouched.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::SystemTime;

use axum::http::{HeaderName, HeaderValue, Request, Response};
use tower::{Layer, Service};

use crate::observability::segment::Subsegment;
use crate::observability::trace_context::{SpanId, TraceContext};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Clone, Copy, Default)]
pub struct PropagateTraceLayer;

impl<S> Layer<S> for PropagateTraceLayer {
    type Service = PropagateTrace<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PropagateTrace { inner }
    }
}

#[derive(Debug, Clone)]
pub struct PropagateTrace<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for PropagateTrace<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let Some(ctx) = request.extensions().get::<TraceContext>().cloned() else {
            return Box::pin(self.inner.call(request));
        };

        let subsegment_id = SpanId::generate();
        let headers = request.headers_mut();
        for (name, value) in ctx.propagation_headers(subsegment_id) {
            headers.insert(name, value);
        }
        if let Some(value) = ctx.request_id().and_then(|id| HeaderValue::from_str(id).ok()) {
            headers.insert(X_REQUEST_ID, value);
        }

        let method = request.method().to_string();
        let url = request.uri().to_string();
        let host = request.uri().host().unwrap_or("unknown").to_string();
        let started = SystemTime::now();

        tracing::debug!(
            trace_id = %ctx.trace_id(),
            subsegment_id = %subsegment_id,
            url = %url,
            "Propagating trace context downstream"
        );

        let future = self.inner.call(request);
        Box::pin(async move {
            let result = future.await;
            let status = result.as_ref().ok().map(|r| r.status().as_u16());
            ctx.record_subsegment(Subsegment::remote(
                subsegment_id,
                &method,
                &url,
                &host,
                started,
                status,
            ));
            result
        })
    }
}
