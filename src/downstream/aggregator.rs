//! Two-stage aggregation pipeline.
//!
//! Backend 1 is always called first; backend 2 is called only when stage 1
//! produced a value. The first failure ends the pipeline.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::config::DownstreamConfig;
use crate::downstream::{Backend, DownstreamClient, DownstreamError};
use crate::observability::metrics;
use crate::observability::trace_context::TraceContext;

/// Body returned by `GET /api`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResponse {
    pub current_date: Value,
    pub current_time: Value,
}

#[derive(Clone)]
pub struct Aggregator {
    client: DownstreamClient,
    config: DownstreamConfig,
}

impl Aggregator {
    pub fn new(config: DownstreamConfig) -> Self {
        Self {
            client: DownstreamClient::new(config.max_body_bytes),
            config,
        }
    }

    pub async fn aggregate(&self, ctx: &TraceContext) -> Result<AggregatedResponse, DownstreamError> {
        let current_date = self.stage(Backend::One, ctx).await?;
        let current_time = self.stage(Backend::Two, ctx).await?;

        Ok(AggregatedResponse {
            current_date,
            current_time,
        })
    }

    async fn stage(&self, backend: Backend, ctx: &TraceContext) -> Result<Value, DownstreamError> {
        let start = Instant::now();
        let url = self.resolve_url(backend);

        tracing::debug!(backend = %backend, url = %url, "Calling backend");

        let result = self
            .client
            .get_json(backend, &url, ctx)
            .await
            .and_then(|body| extract_field(backend, &body, self.config.strict_fields));

        match &result {
            Ok(_) => metrics::record_downstream(backend.label(), "success", start),
            Err(e) => metrics::record_downstream(backend.label(), e.kind(), start),
        }
        result
    }

    /// Configured URL, else the environment, else empty. Read on every call.
    fn resolve_url(&self, backend: Backend) -> String {
        let configured = match backend {
            Backend::One => self.config.backend_1_url.as_ref(),
            Backend::Two => self.config.backend_2_url.as_ref(),
        };
        match configured {
            Some(url) => url.clone(),
            None => std::env::var(backend.env_var()).unwrap_or_default(),
        }
    }
}

/// Pull the backend's field out of its body. Absent fields become `null`
/// unless `strict` is set.
fn extract_field(backend: Backend, body: &Value, strict: bool) -> Result<Value, DownstreamError> {
    match body.get(backend.field()) {
        Some(value) => Ok(value.clone()),
        None if strict => Err(DownstreamError::Malformed {
            backend,
            reason: format!("missing field '{}'", backend.field()),
        }),
        None => {
            tracing::warn!(backend = %backend, field = backend.field(), "Backend response missing field, using null");
            Ok(Value::Null)
        }
    }
}
