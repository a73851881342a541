//! Route handlers.

use axum::{
    extract::State,
    Extension, Json,
};
use serde::Serialize;

use crate::downstream::{AggregatedResponse, DownstreamError};
use crate::http::server::AppState;
use crate::observability::trace_context::TraceContext;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// Liveness probe. Touches nothing downstream.
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

/// Aggregate backend 1's date with backend 2's time.
pub async fn api(
    State(state): State<AppState>,
    Extension(ctx): Extension<TraceContext>,
) -> Result<Json<AggregatedResponse>, DownstreamError> {
    match state.aggregator.aggregate(&ctx).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::error!(
                request_id = ctx.request_id().unwrap_or("unknown"),
                trace_id = %ctx.trace_id(),
                backend = %e.backend(),
                error = %e,
                "Downstream call failed"
            );
            Err(e)
        }
    }
}
