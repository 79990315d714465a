//! Startup orchestration.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ConfigError, ServiceConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Errors that abort startup or serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid metrics address {address:?}: {reason}")]
    MetricsAddress { address: String, reason: String },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Start the configured role and serve until a stop signal arrives.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    let server = HttpServer::new(config)?;
    let config = server.config();

    if let Some(address) = &config.observability.metrics_address {
        let addr: SocketAddr = address.parse().map_err(|e: std::net::AddrParseError| {
            StartupError::MetricsAddress {
                address: address.clone(),
                reason: e.to_string(),
            }
        })?;
        metrics::init_metrics(addr)?;
    }

    // Validated in HttpServer::new; names resolve here.
    let address = config.bind_target();
    let listener = TcpListener::bind(address.as_str())
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    tracing::info!(role = %config.role, address = %address, "Starting service");

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    server.run(listener, stop).await.map_err(StartupError::Serve)
}
