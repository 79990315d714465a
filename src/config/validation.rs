//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (probability in [0, 1], finite rate limit)
//! - Check that addresses are well-formed before anything binds or connects
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{Role, ServiceConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("error probability {0} is outside [0.0, 1.0]")]
    ErrorProbability(f64),

    #[error("rate limit {0} is not a finite number")]
    RateLimit(f64),

    #[error("invalid bind address {address:?}: {reason}")]
    BindAddress { address: String, reason: String },

    #[error("invalid upstream URI {uri:?}: {reason}")]
    UpstreamUri { uri: String, reason: String },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let p = config.upstream.error_probability;
    if !(0.0..=1.0).contains(&p) {
        errors.push(ValidationError::ErrorProbability(p));
    }

    if !config.upstream.rate_limit.is_finite() {
        errors.push(ValidationError::RateLimit(config.upstream.rate_limit));
    }

    if let Err(reason) = check_host_port(&config.bind_target()) {
        errors.push(ValidationError::BindAddress {
            address: config.bind_address.clone(),
            reason,
        });
    }

    // Only the proxy ever dials the upstream.
    if config.role == Role::Downstream {
        match config.upstream_target() {
            Ok(uri) if uri.host().is_none() => errors.push(ValidationError::UpstreamUri {
                uri: config.upstream_uri.clone(),
                reason: "missing host".into(),
            }),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::UpstreamUri {
                uri: config.upstream_uri.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Syntactic `host:port` check. Name resolution is left to bind time.
fn check_host_port(address: &str) -> Result<(), String> {
    if address.parse::<SocketAddr>().is_ok() {
        return Ok(());
    }
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| "expected host:port".to_string())?;
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err("missing or malformed host".into());
    }
    port.parse::<u16>()
        .map(|_| ())
        .map_err(|e| format!("invalid port: {e}"))
}
