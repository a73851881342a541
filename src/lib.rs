//! Backend-for-frontend aggregator library.

pub mod config;
pub mod downstream;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::BffConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
