//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Validate the service configuration
//! - Create the Axum Router for the configured role
//! - Wire up middleware (request ID, tracing)
//! - Serve on a listener until the shutdown signal fires
//!
//! No timeout layer is installed; handlers run for as long as the upstream
//! call or simulated delay takes.

use std::sync::Arc;

use axum::{body::Body, http::Request, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{validate_config, ConfigError, Role, ServiceConfig, ValidationError};
use crate::downstream::{downstream_handler, DownstreamProxy};
use crate::http::request::{propagate_request_id_layer, request_id_str, set_request_id_layer};
use crate::upstream::{upstream_handler, DecisionSource, RandomDecisions, UpstreamSimulator};

/// HTTP server for one harness role.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, ConfigError> {
        Self::with_decisions(config, Arc::new(RandomDecisions))
    }

    /// Create a server whose upstream draws come from `decisions`.
    pub fn with_decisions(
        config: ServiceConfig,
        decisions: Arc<dyn DecisionSource>,
    ) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let handlers = match config.role {
            Role::Upstream => {
                let simulator = UpstreamSimulator::with_decisions(&config.upstream, decisions);
                tracing::info!(
                    error_probability = config.upstream.error_probability,
                    rate_limit = ?simulator.limiter().map(|l| l.rate()),
                    burst = ?simulator.limiter().map(|l| l.burst()),
                    latency = ?config.upstream.latency,
                    base_delay_ms = config.upstream.base_delay_ms,
                    "Upstream simulator configured"
                );
                Router::new()
                    .route("/", any(upstream_handler))
                    .route("/{*path}", any(upstream_handler))
                    .with_state(Arc::new(simulator))
            }
            Role::Downstream => {
                let target = config.upstream_target().map_err(|e| {
                    ConfigError::Validation(vec![ValidationError::UpstreamUri {
                        uri: config.upstream_uri.clone(),
                        reason: e.to_string(),
                    }])
                })?;
                tracing::info!(upstream = %target, "Downstream proxy configured");
                Router::new()
                    .route("/", any(downstream_handler))
                    .route("/{*path}", any(downstream_handler))
                    .with_state(Arc::new(DownstreamProxy::new(target)))
            }
        };

        Ok(Self {
            router: Self::build_router(handlers),
            config,
        })
    }

    /// Wrap role handlers with the shared middleware stack.
    fn build_router(handlers: Router) -> Router {
        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                request_id = %request_id_str(request.headers()),
                method = %request.method(),
                path = %request.uri().path(),
            )
        });

        handlers.layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(trace)
                .layer(propagate_request_id_layer()),
        )
    }

    /// Router with all middleware applied.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run the server, accepting connections until `shutdown` fires.
    ///
    /// In-flight requests are drained before this returns.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            role = %self.config.role,
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
