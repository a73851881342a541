//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (HTTP tracing, request ID, trace segments)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::BffConfig;
use crate::downstream::Aggregator;
use crate::http::handlers;
use crate::http::middleware::trace_segment;
use crate::http::request::MakeRequestUuid;
use crate::observability::segment::Tracer;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

/// HTTP server for the aggregator.
pub struct HttpServer {
    router: Router,
    config: BffConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: BffConfig) -> Self {
        let tracer = Tracer::from_config(&config.tracing);
        Self::with_tracer(config, tracer)
    }

    /// Create a server that hands closed segments to `tracer`.
    pub fn with_tracer(config: BffConfig, tracer: Tracer) -> Self {
        let state = AppState {
            aggregator: Arc::new(Aggregator::new(config.downstream.clone())),
        };

        let router = Self::build_router(state, tracer);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, tracer: Tracer) -> Router {
        Router::new()
            .route("/api", get(handlers::api))
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(middleware::from_fn_with_state(tracer, trace_segment))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for serving or driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain open connections.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.tracing.service_name,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BffConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::segment::{Segment, SegmentEmitter};
    use crate::config::PropagationStyle;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Segment>>);

    impl SegmentEmitter for Collect {
        fn emit(&self, segment: &Segment) {
            self.0.lock().unwrap().push(segment.clone());
        }
    }

    fn server(collect: Arc<Collect>) -> HttpServer {
        let mut config = BffConfig::default();
        config.downstream.backend_1_url = Some(String::new());
        config.downstream.backend_2_url = Some(String::new());
        HttpServer::with_tracer(config, Tracer::new("BFF", PropagationStyle::Both, collect))
    }

    #[tokio::test]
    async fn test_health_ok_and_traced() {
        let collect = Arc::new(Collect::default());
        let response = server(collect.clone())
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-amzn-trace-id"));
        assert!(response.headers().contains_key("traceparent"));

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], br#"{"status":"ok"}"#);

        let segments = collect.0.lock().unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].name, "BFF");
        assert_eq!(segments[0].http.response.status, Some(200));
        assert!(segments[0].request_id.is_some());
    }

    #[tokio::test]
    async fn test_api_with_unset_backend_is_bad_gateway() {
        let collect = Arc::new(Collect::default());
        let response = server(collect.clone())
            .router()
            .oneshot(Request::get("/api").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let segments = collect.0.lock().unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].fault);
        assert!(segments[0].subsegments.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route_is_traced_404() {
        let collect = Arc::new(Collect::default());
        let response = server(collect.clone())
            .router()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let segments = collect.0.lock().unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].error);
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let collect = Arc::new(Collect::default());
        let response = server(collect.clone())
            .router()
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "caller-chosen")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-request-id").unwrap(), "caller-chosen");
        let segments = collect.0.lock().unwrap();
        assert_eq!(segments[0].request_id.as_deref(), Some("caller-chosen"));
    }
}
