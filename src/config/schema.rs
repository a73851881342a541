//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the aggregator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the aggregator service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BffConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Downstream backend settings.
    pub downstream: DownstreamConfig,

    /// Trace segment and propagation settings.
    pub tracing: TracingConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
        }
    }
}

/// Downstream backend configuration.
///
/// Unset URLs fall back to `BACKEND_1_URL` / `BACKEND_2_URL`, read when each
/// request is handled rather than at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// URL of the backend providing `currentDate`.
    pub backend_1_url: Option<String>,

    /// URL of the backend providing `currentTime`.
    pub backend_2_url: Option<String>,

    /// Maximum response body size read from a backend.
    pub max_body_bytes: usize,

    /// Treat a missing field in a backend response as a failure instead of `null`.
    pub strict_fields: bool,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            backend_1_url: None,
            backend_2_url: None,
            max_body_bytes: 1024 * 1024,
            strict_fields: false,
        }
    }
}

/// Which trace headers are read from and written to HTTP messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropagationStyle {
    /// W3C `traceparent` only.
    W3c,
    /// `X-Amzn-Trace-Id` only.
    Xray,
    /// Both header families.
    #[default]
    Both,
}

impl PropagationStyle {
    pub fn w3c(self) -> bool {
        matches!(self, PropagationStyle::W3c | PropagationStyle::Both)
    }

    pub fn xray(self) -> bool {
        matches!(self, PropagationStyle::Xray | PropagationStyle::Both)
    }
}

/// Trace segment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Segment name recorded for every inbound request.
    pub service_name: String,

    /// Header families used for propagation.
    pub propagation: PropagationStyle,

    /// UDP address of a trace collector daemon. Segments are logged when unset.
    pub daemon_address: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "BFF".to_string(),
            propagation: PropagationStyle::Both,
            daemon_address: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive, overridden by `RUST_LOG`.
    pub log_level: String,

    /// Human readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "bff_aggregator=info,tower_http=info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
