//! Downstream calling subsystem.
//!
//! # Data Flow
//! ```text
//! GET /api
//!     → aggregator.rs (stage 1: backend 1 → currentDate)
//!     → aggregator.rs (stage 2: backend 2 → currentTime, only after stage 1)
//!     → client.rs (traced GET, JSON decode)
//!     → AggregatedResponse or DownstreamError
//! ```

pub mod aggregator;
pub mod client;
pub mod error;

use std::fmt;

pub use aggregator::{AggregatedResponse, Aggregator};
pub use client::DownstreamClient;
pub use error::DownstreamError;

/// One of the two services the aggregator depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Provides `currentDate`.
    One,
    /// Provides `currentTime`.
    Two,
}

impl Backend {
    pub fn label(self) -> &'static str {
        match self {
            Backend::One => "backend_1",
            Backend::Two => "backend_2",
        }
    }

    /// Environment variable holding the URL when the config file does not.
    pub fn env_var(self) -> &'static str {
        match self {
            Backend::One => "BACKEND_1_URL",
            Backend::Two => "BACKEND_2_URL",
        }
    }

    /// Response field read from this backend.
    pub fn field(self) -> &'static str {
        match self {
            Backend::One => "currentDate",
            Backend::Two => "currentTime",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
