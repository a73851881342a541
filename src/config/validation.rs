//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and backend URLs
//! - Validate value ranges (body limit > 0, service name length)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BffConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::Uri;
use thiserror::Error;

use crate::config::schema::BffConfig;

/// Longest segment name accepted by trace collectors.
const MAX_SERVICE_NAME_LEN: usize = 200;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid backend URL '{value}' ({reason})")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("downstream.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("tracing.service_name must be between 1 and 200 characters")]
    InvalidServiceName,
}

/// Check a parsed configuration, collecting every error found.
pub fn validate_config(config: &BffConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);

    if let Some(url) = &config.downstream.backend_1_url {
        check_backend_url("downstream.backend_1_url", url, &mut errors);
    }
    if let Some(url) = &config.downstream.backend_2_url {
        check_backend_url("downstream.backend_2_url", url, &mut errors);
    }
    if config.downstream.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let name_len = config.tracing.service_name.chars().count();
    if name_len == 0 || name_len > MAX_SERVICE_NAME_LEN {
        errors.push(ValidationError::InvalidServiceName);
    }
    if let Some(addr) = &config.tracing.daemon_address {
        check_address("tracing.daemon_address", addr, &mut errors);
    }

    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_backend_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    let invalid = |reason| ValidationError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };

    let uri = match value.parse::<Uri>() {
        Ok(uri) => uri,
        Err(_) => {
            errors.push(invalid("unparseable"));
            return;
        }
    };
    match uri.scheme_str() {
        Some("http") => {}
        Some(_) => errors.push(invalid("only http is supported")),
        None => errors.push(invalid("missing scheme")),
    }
    if uri.host().is_none() {
        errors.push(invalid("missing host"));
    }
}
