//! Trace segments and their emitters.
//!
//! A [`Segment`] records one inbound request; each outbound call made while
//! handling it becomes a [`Subsegment`]. Closed segments are handed to a
//! [`SegmentEmitter`], which decides where they go.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::config::{PropagationStyle, TracingConfig};
use crate::observability::trace_context::{IncomingContext, SpanId, TraceContext};

/// Seconds since the epoch with sub-second precision.
pub fn epoch_seconds(at: SystemTime) -> f64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpRequestInfo {
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpResponseInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpInfo {
    pub request: HttpRequestInfo,
    pub response: HttpResponseInfo,
}

impl HttpInfo {
    pub fn new(method: impl Into<String>, url: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            request: HttpRequestInfo {
                method: method.into(),
                url: url.into(),
            },
            response: HttpResponseInfo { status },
        }
    }
}

/// One outbound call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subsegment {
    pub name: String,
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub namespace: &'static str,
    pub http: HttpInfo,
    /// Client error (4xx).
    pub error: bool,
    /// Server error (5xx) or no response at all.
    pub fault: bool,
}

impl Subsegment {
    /// `status` is `None` when the call failed before a response arrived.
    pub fn remote(
        id: SpanId,
        method: &str,
        url: &str,
        host: &str,
        started: SystemTime,
        status: Option<u16>,
    ) -> Self {
        let (error, fault) = classify(status);
        Self {
            name: host.to_string(),
            id: id.to_string(),
            start_time: epoch_seconds(started),
            end_time: epoch_seconds(SystemTime::now()),
            namespace: "remote",
            http: HttpInfo::new(method, url, status),
            error,
            fault,
        }
    }
}

/// One inbound request, closed once the response is produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub name: String,
    pub id: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
    pub http: HttpInfo,
    pub error: bool,
    pub fault: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subsegments: Vec<Subsegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

fn classify(status: Option<u16>) -> (bool, bool) {
    match status {
        Some(s) if (400..500).contains(&s) => (true, false),
        Some(s) if s >= 500 => (false, true),
        Some(_) => (false, false),
        None => (false, true),
    }
}

/// Destination for closed segments.
pub trait SegmentEmitter: Send + Sync + 'static {
    fn emit(&self, segment: &Segment);
}

/// Writes each segment as a structured log event.
#[derive(Debug, Default)]
pub struct LogEmitter;

impl SegmentEmitter for LogEmitter {
    fn emit(&self, segment: &Segment) {
        match serde_json::to_string(segment) {
            Ok(document) => tracing::info!(
                target: "bff_aggregator::segment",
                name = %segment.name,
                trace_id = %segment.trace_id,
                segment_id = %segment.id,
                document = %document,
                "Segment closed"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize segment"),
        }
    }
}

/// Sends segments as UDP datagrams to a collector daemon.
#[derive(Debug)]
pub struct DaemonEmitter {
    socket: UdpSocket,
    target: SocketAddr,
}

const DAEMON_HEADER: &str = "{\"format\":\"json\",\"version\":1}\n";

impl DaemonEmitter {
    /// The local socket is bound in the target's address family.
    pub fn new(target: &str) -> std::io::Result<Self> {
        let target: SocketAddr = target
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let local = if target.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, target })
    }
}

impl SegmentEmitter for DaemonEmitter {
    fn emit(&self, segment: &Segment) {
        let document = match serde_json::to_string(segment) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize segment");
                return;
            }
        };
        let datagram = format!("{DAEMON_HEADER}{document}");
        if let Err(e) = self.socket.send_to(datagram.as_bytes(), self.target) {
            tracing::warn!(target_addr = %self.target, error = %e, "Failed to send segment to daemon");
        }
    }
}

/// Opens and closes segments for one named service.
#[derive(Clone)]
pub struct Tracer {
    service_name: String,
    style: PropagationStyle,
    emitter: Arc<dyn SegmentEmitter>,
}

impl Tracer {
    pub fn new(
        service_name: impl Into<String>,
        style: PropagationStyle,
        emitter: Arc<dyn SegmentEmitter>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            style,
            emitter,
        }
    }

    /// Build a tracer from configuration, falling back to logging when the
    /// daemon socket cannot be opened.
    pub fn from_config(config: &TracingConfig) -> Self {
        let emitter: Arc<dyn SegmentEmitter> = match &config.daemon_address {
            Some(addr) => match DaemonEmitter::new(addr) {
                Ok(emitter) => {
                    tracing::info!(daemon = %addr, "Emitting segments to trace daemon");
                    Arc::new(emitter)
                }
                Err(e) => {
                    tracing::error!(daemon = %addr, error = %e, "Trace daemon socket unavailable, logging segments instead");
                    Arc::new(LogEmitter)
                }
            },
            None => Arc::new(LogEmitter),
        };
        Self::new(config.service_name.clone(), config.propagation, emitter)
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn style(&self) -> PropagationStyle {
        self.style
    }

    /// Start a segment for an inbound request.
    pub fn open(&self, incoming: Option<IncomingContext>, request_id: Option<String>) -> TraceContext {
        TraceContext::new(incoming, self.style, request_id)
    }

    /// Close the segment and hand it to the emitter. Unsampled traces are dropped.
    pub fn close(&self, ctx: &TraceContext, started: SystemTime, http: HttpInfo) -> Option<Segment> {
        let (error, fault) = classify(http.response.status);
        let segment = Segment {
            name: self.service_name.clone(),
            id: ctx.segment_id().to_string(),
            trace_id: ctx.trace_id().to_xray(),
            parent_id: ctx.parent_id().map(|p| p.to_string()),
            start_time: epoch_seconds(started),
            end_time: epoch_seconds(SystemTime::now()),
            http,
            error,
            fault,
            subsegments: ctx.take_subsegments(),
            request_id: ctx.request_id().map(str::to_string),
        };

        if !ctx.sampled() {
            return None;
        }
        self.emitter.emit(&segment);
        Some(segment)
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("service_name", &self.service_name)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}
