//! Server-level middleware.

pub mod trace_segment;

pub use trace_segment::trace_segment;
