//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a harness
//! service. All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use axum::http::uri::{InvalidUri, Uri};
use serde::{Deserialize, Serialize};

/// Which half of the harness this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fault-injecting leaf service.
    Upstream,
    /// Single-hop proxy in front of an upstream.
    Downstream,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Upstream => "upstream",
            Role::Downstream => "downstream",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root configuration for a harness service.
///
/// Built once at startup and treated as read-only afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service role (upstream or downstream).
    pub role: Role,

    /// Bind address as `host:port`; the host may be a name or an IP. A
    /// leading `:` (e.g. ":9090") binds all interfaces.
    pub bind_address: String,

    /// Target the downstream proxy calls, as `host:port` or a full URI.
    pub upstream_uri: String,

    /// Fault injection settings used by the upstream role.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            role: Role::Downstream,
            bind_address: ":9090".to_string(),
            upstream_uri: "localhost:9000".to_string(),
            upstream: UpstreamConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Bind address with an empty host replaced by `0.0.0.0`.
    ///
    /// Names are resolved when the listener binds.
    pub fn bind_target(&self) -> String {
        if self.bind_address.starts_with(':') {
            format!("0.0.0.0{}", self.bind_address)
        } else {
            self.bind_address.clone()
        }
    }

    /// Resolve the upstream target into an absolute URI.
    ///
    /// A bare `host:port` is given the `http` scheme.
    pub fn upstream_target(&self) -> Result<Uri, InvalidUri> {
        if self.upstream_uri.contains("://") {
            self.upstream_uri.parse()
        } else {
            format!("http://{}", self.upstream_uri).parse()
        }
    }
}

/// How the upstream derives its success-path delay from the random draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LatencyMode {
    /// `base_delay_ms + n` milliseconds.
    Variable,
    /// Always `base_delay_ms` milliseconds.
    Fixed,
}

/// Upstream fault injection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Probability (0.0 - 1.0) that an admitted request fails with a 500.
    pub error_probability: f64,

    /// Admitted requests per second. Zero or negative disables limiting.
    pub rate_limit: f64,

    /// Latency mode for successful responses.
    pub latency: LatencyMode,

    /// Base delay added to every successful response.
    pub base_delay_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            error_probability: 0.0,
            rate_limit: 0.0,
            latency: LatencyMode::Variable,
            base_delay_ms: 20,
        }
    }
}

impl UpstreamConfig {
    /// Rate limit in requests/second, if limiting is enabled.
    pub fn rate_limit(&self) -> Option<f64> {
        (self.rate_limit > 0.0).then_some(self.rate_limit)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Prometheus scrape endpoint bind address. Unset disables the exporter.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "fault_harness=debug,tower_http=debug".to_string(),
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.role, Role::Downstream);
        assert_eq!(config.upstream.error_probability, 0.0);
        assert_eq!(config.upstream.rate_limit(), None);
        assert_eq!(config.upstream.base_delay(), Duration::from_millis(20));
        assert_eq!(config.upstream.latency, LatencyMode::Variable);
    }

    #[test]
    fn port_only_bind_address_binds_all_interfaces() {
        let config = ServiceConfig::default();
        assert_eq!(config.bind_target(), "0.0.0.0:9090");

        let config = ServiceConfig {
            bind_address: "localhost:7000".into(),
            ..Default::default()
        };
        assert_eq!(config.bind_target(), "localhost:7000");
    }

    #[tokio::test]
    async fn hostname_bind_target_resolves() {
        let config = ServiceConfig {
            bind_address: "localhost:0".into(),
            ..Default::default()
        };
        let listener = tokio::net::TcpListener::bind(config.bind_target()).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[test]
    fn bare_upstream_gets_http_scheme() {
        let config = ServiceConfig::default();
        let uri = config.upstream_target().unwrap();
        assert_eq!(uri.scheme_str(), Some("http"));
        assert_eq!(uri.host(), Some("localhost"));
        assert_eq!(uri.port_u16(), Some(9000));

        let config = ServiceConfig {
            upstream_uri: "http://10.0.0.1:9001/ping".into(),
            ..Default::default()
        };
        assert_eq!(config.upstream_target().unwrap().path(), "/ping");
    }

    #[test]
    fn non_positive_rate_disables_limiting() {
        let mut upstream = UpstreamConfig::default();
        upstream.rate_limit = -3.0;
        assert_eq!(upstream.rate_limit(), None);
        upstream.rate_limit = 50.0;
        assert_eq!(upstream.rate_limit(), Some(50.0));
    }
}
