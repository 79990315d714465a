//! Fault-injecting response policy.
//!
//! Every request is evaluated in a fixed order:
//! 1. rate limiter (if configured): denial ends evaluation with a 500
//! 2. one draw `n` in `0..100`: `error_probability * 100 > n` fails with a 500
//! 3. otherwise sleep, then answer 200 with [`UPSTREAM_OK_BODY`]
//!
//! The two failure causes produce identical responses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::State, response::Response};

use crate::config::{LatencyMode, UpstreamConfig};
use crate::http::response::{plain_text, server_error};
use crate::observability::metrics;
use crate::security::RateLimiter;
use crate::upstream::decision::{DecisionSource, RandomDecisions};

/// Body of every successful upstream response.
pub const UPSTREAM_OK_BODY: &str = "request ok from upstream";

/// Result of evaluating one request against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The limiter had no token available.
    RateLimited,
    /// The random draw selected a failure.
    Fail,
    /// Succeed after sleeping for `delay`.
    Succeed { delay: Duration },
}

/// Upstream simulator state shared by all handlers.
pub struct UpstreamSimulator {
    limiter: Option<RateLimiter>,
    decisions: Arc<dyn DecisionSource>,
    error_probability: f64,
    latency: LatencyMode,
    base_delay: Duration,
}

impl UpstreamSimulator {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self::with_decisions(config, Arc::new(RandomDecisions))
    }

    pub fn with_decisions(config: &UpstreamConfig, decisions: Arc<dyn DecisionSource>) -> Self {
        let limiter = config.rate_limit().and_then(RateLimiter::per_second);
        if let Some(limiter) = &limiter {
            if limiter.burst() == 0 {
                tracing::warn!(
                    rate = limiter.rate(),
                    "Rate limit below 10 req/s yields a zero burst; every request will be rejected"
                );
            }
        }

        Self {
            limiter,
            decisions,
            error_probability: config.error_probability,
            latency: config.latency,
            base_delay: config.base_delay(),
        }
    }

    pub fn limiter(&self) -> Option<&RateLimiter> {
        self.limiter.as_ref()
    }

    /// Evaluate the policy for one request.
    ///
    /// Consumes a limiter token when limiting is enabled and, unless the
    /// limiter denies, exactly one draw.
    pub fn decide(&self) -> Outcome {
        if let Some(limiter) = &self.limiter {
            if !limiter.allow() {
                return Outcome::RateLimited;
            }
        }

        let n = self.decisions.sample();
        if self.error_probability * 100.0 > n as f64 {
            return Outcome::Fail;
        }

        let delay = match self.latency {
            LatencyMode::Variable => self.base_delay + Duration::from_millis(u64::from(n)),
            LatencyMode::Fixed => self.base_delay,
        };
        Outcome::Succeed { delay }
    }

    /// Evaluate the policy and produce the response, sleeping on success.
    pub async fn respond(&self) -> Response {
        match self.decide() {
            Outcome::RateLimited => {
                tracing::info!("throwing rate limit error");
                metrics::record_fault("rate_limited");
                server_error()
            }
            Outcome::Fail => {
                tracing::info!("throwing error");
                metrics::record_fault("random_failure");
                server_error()
            }
            Outcome::Succeed { delay } => {
                tokio::time::sleep(delay).await;
                plain_text(UPSTREAM_OK_BODY)
            }
        }
    }
}

/// Handler for every upstream path.
pub async fn upstream_handler(State(simulator): State<Arc<UpstreamSimulator>>) -> Response {
    let start_time = Instant::now();
    tracing::debug!("Got request");

    let response = simulator.respond().await;
    metrics::record_request("upstream", response.status().as_u16(), start_time);
    response
}
