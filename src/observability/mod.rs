//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → trace_context.rs (extract traceparent / X-Amzn-Trace-Id)
//!     → segment.rs (open "BFF" segment)
//!
//! Outbound call:
//!     → propagation.rs (inject headers, record subsegment)
//!
//! Response sent:
//!     → segment.rs (close segment, hand to emitter)
//!     → metrics.rs (counters, histograms)
//!     → logging.rs (structured log events)
//! ```
//!
//! # Design Decisions
//! - Trace context is per request and travels in request extensions
//! - Emitters are pluggable: log line or collector daemon
//! - Metrics are cheap (no-ops unless an exporter is installed)

pub mod logging;
pub mod metrics;
pub mod propagation;
pub mod segment;
pub mod trace_context;

pub use propagation::{PropagateTrace, PropagateTraceLayer};
pub use segment::{LogEmitter, Segment, SegmentEmitter, Subsegment, Tracer};
pub use trace_context::{SpanId, TraceContext, TraceId};
