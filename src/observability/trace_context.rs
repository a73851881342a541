//! Trace identity and header codecs.
//!
//! Two header families are understood:
//!
//! ```text
//! traceparent:      00-<32 hex trace id>-<16 hex parent id>-<2 hex flags>
//! X-Amzn-Trace-Id:  Root=1-<8 hex epoch>-<24 hex>;Parent=<16 hex>;Sampled=<0|1>
//! ```
//!
//! Both carry the same 128-bit trace id, so a trace started by one family can be
//! continued by the other.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use rand::Rng;

use crate::config::PropagationStyle;
use crate::observability::segment::Subsegment;

pub const TRACEPARENT: HeaderName = HeaderName::from_static("traceparent");
pub const X_AMZN_TRACE_ID: HeaderName = HeaderName::from_static("x-amzn-trace-id");

/// 128-bit trace identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId([u8; 16]);

impl TraceId {
    /// New trace id whose first four bytes are the current epoch seconds.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();
        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill(&mut bytes[4..]);
        Self(bytes)
    }

    /// Parse 32 lowercase or uppercase hex characters. All-zero ids are invalid.
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        (bytes != [0u8; 16]).then_some(Self(bytes))
    }

    /// Parse the `1-<epoch>-<random>` form.
    pub fn from_xray(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, '-');
        if parts.next()? != "1" {
            return None;
        }
        let epoch = parts.next()?;
        let random = parts.next()?;
        if epoch.len() != 8 || random.len() != 24 {
            return None;
        }
        Self::from_hex(&format!("{epoch}{random}"))
    }

    /// Render in the `1-<epoch>-<random>` form.
    pub fn to_xray(&self) -> String {
        let hex = self.to_string();
        format!("1-{}-{}", &hex[..8], &hex[8..])
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// 64-bit segment or subsegment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId([u8; 8]);

impl SpanId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill(&mut bytes[..]);
        if bytes == [0u8; 8] {
            bytes[7] = 1;
        }
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        (bytes != [0u8; 8]).then_some(Self(bytes))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Trace context received from an upstream caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingContext {
    pub trace_id: TraceId,
    pub parent_id: Option<SpanId>,
    pub sampled: bool,
}

impl IncomingContext {
    /// Extract a context, preferring `traceparent` over `X-Amzn-Trace-Id`.
    pub fn from_headers(headers: &HeaderMap, style: PropagationStyle) -> Option<Self> {
        let header = |name: &HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

        if style.w3c() {
            if let Some(ctx) = header(&TRACEPARENT).and_then(parse_traceparent) {
                return Some(ctx);
            }
        }
        if style.xray() {
            if let Some(ctx) = header(&X_AMZN_TRACE_ID).and_then(parse_xray_header) {
                return Some(ctx);
            }
        }
        None
    }
}

/// Parse a W3C `traceparent` value.
pub fn parse_traceparent(value: &str) -> Option<IncomingContext> {
    let mut parts = value.trim().split('-');
    let version = parts.next()?;
    let trace_id = parts.next()?;
    let parent_id = parts.next()?;
    let flags = parts.next()?;

    if version.len() != 2 || version.eq_ignore_ascii_case("ff") {
        return None;
    }
    // Version 00 has exactly four fields; later versions may append more.
    if version == "00" && parts.next().is_some() {
        return None;
    }
    if trace_id.len() != 32 || parent_id.len() != 16 || flags.len() != 2 {
        return None;
    }
    let flags = u8::from_str_radix(flags, 16).ok()?;

    Some(IncomingContext {
        trace_id: TraceId::from_hex(trace_id)?,
        parent_id: Some(SpanId::from_hex(parent_id)?),
        sampled: flags & 0x01 == 0x01,
    })
}

/// Parse an `X-Amzn-Trace-Id` value. `Root` is required.
pub fn parse_xray_header(value: &str) -> Option<IncomingContext> {
    let mut trace_id = None;
    let mut parent_id = None;
    let mut sampled = true;

    for field in value.split(';') {
        let Some((key, val)) = field.split_once('=') else {
            continue;
        };
        match key.trim() {
            "Root" => trace_id = TraceId::from_xray(val.trim()),
            "Parent" => parent_id = SpanId::from_hex(val.trim()),
            "Sampled" => sampled = val.trim() != "0",
            _ => {}
        }
    }

    Some(IncomingContext {
        trace_id: trace_id?,
        parent_id,
        sampled,
    })
}

/// Per-request trace state, carried in request extensions.
///
/// Cloning shares the subsegment list, so outbound calls made with a clone are
/// recorded on the same segment.
#[derive(Debug, Clone)]
pub struct TraceContext {
    trace_id: TraceId,
    segment_id: SpanId,
    parent_id: Option<SpanId>,
    sampled: bool,
    style: PropagationStyle,
    request_id: Option<String>,
    subsegments: Arc<Mutex<Vec<Subsegment>>>,
}

impl TraceContext {
    /// Continue `incoming` when present, otherwise start a new sampled trace.
    pub fn new(
        incoming: Option<IncomingContext>,
        style: PropagationStyle,
        request_id: Option<String>,
    ) -> Self {
        let (trace_id, parent_id, sampled) = match incoming {
            Some(ctx) => (ctx.trace_id, ctx.parent_id, ctx.sampled),
            None => (TraceId::generate(), None, true),
        };
        Self {
            trace_id,
            segment_id: SpanId::generate(),
            parent_id,
            sampled,
            style,
            request_id,
            subsegments: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn segment_id(&self) -> SpanId {
        self.segment_id
    }

    pub fn parent_id(&self) -> Option<SpanId> {
        self.parent_id
    }

    pub fn sampled(&self) -> bool {
        self.sampled
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Headers announcing `parent` as the caller of the next hop.
    pub fn propagation_headers(&self, parent: SpanId) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = Vec::with_capacity(2);
        if self.style.w3c() {
            let value = format!(
                "00-{}-{}-{}",
                self.trace_id,
                parent,
                if self.sampled { "01" } else { "00" }
            );
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.push((TRACEPARENT, value));
            }
        }
        if self.style.xray() {
            let value = format!(
                "Root={};Parent={};Sampled={}",
                self.trace_id.to_xray(),
                parent,
                u8::from(self.sampled)
            );
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.push((X_AMZN_TRACE_ID, value));
            }
        }
        headers
    }

    pub fn record_subsegment(&self, subsegment: Subsegment) {
        let mut guard = self.subsegments.lock().unwrap_or_else(|e| e.into_inner());
        guard.push(subsegment);
    }

    pub fn take_subsegments(&self) -> Vec<Subsegment> {
        let mut guard = self.subsegments.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }
}
