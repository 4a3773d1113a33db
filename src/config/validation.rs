//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Check that classification paths are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MuxConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::MuxConfig;
use crate::security::access_control::AccessGate;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    MaxConnections,

    #[error("paths.{field} {value:?} must be an absolute path other than \"/\"")]
    Path { field: &'static str, value: String },

    #[error("paths.landing_url {0:?} must be an absolute http(s) URL")]
    LandingUrl(String),

    #[error("admin.allowed_ips: {0}")]
    AllowedIps(String),

    #[error("static_files.chunk_size must be greater than zero")]
    ChunkSize,

    #[error("static_files.csv_suffix must not be empty")]
    CsvSuffix,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &MuxConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::MaxConnections);
    }

    for (field, value) in [
        ("admin_root_path", &config.paths.admin_root_path),
        ("websocket_path", &config.paths.websocket_path),
    ] {
        if !value.starts_with('/') || value == "/" {
            errors.push(ValidationError::Path {
                field,
                value: value.clone(),
            });
        }
    }

    match url::Url::parse(&config.paths.landing_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::LandingUrl(config.paths.landing_url.clone())),
    }

    if let Err(e) = AccessGate::from_comma_separated(&config.admin.allowed_ips) {
        errors.push(ValidationError::AllowedIps(e.to_string()));
    }

    if config.static_files.chunk_size == 0 {
        errors.push(ValidationError::ChunkSize);
    }
    if config.static_files.csv_suffix.is_empty() {
        errors.push(ValidationError::CsvSuffix);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
