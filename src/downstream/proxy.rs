//! Single-hop pass-through proxy.
//!
//! One inbound request produces exactly one outbound GET to the configured
//! upstream. The upstream result is translated as follows:
//!
//! | Upstream                  | Caller sees                                  |
//! |---------------------------|----------------------------------------------|
//! | transport failure         | 500, empty body                              |
//! | status other than 200     | 200, `Received error <code> from server`     |
//! | 200 with body `b`         | 200, `Response <b>`                          |
//!
//! Redirects are followed (at most [`MAX_REDIRECTS`] hops) and the final
//! response is the one translated. No retries and no timeouts beyond the
//! client defaults.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri},
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tower::{ServiceBuilder, ServiceExt};
use tower_http::follow_redirect::{policy::Limited, FollowRedirect, FollowRedirectLayer};

use crate::http::request::{request_id, request_id_str, X_REQUEST_ID};
use crate::http::response::{plain_text, server_error};
use crate::observability::metrics;

/// Redirect hops followed before the last redirect response is translated as is.
pub const MAX_REDIRECTS: usize = 10;

/// Prefix of a relayed upstream body.
pub const RESPONSE_PREFIX: &[u8] = b"Response ";

/// Body reported when the upstream answers with a non-200 status.
pub fn upstream_error_body(status: StatusCode) -> String {
    format!("Received error {} from server", status.as_u16())
}

/// Downstream proxy state shared by all handlers.
pub struct DownstreamProxy {
    client: FollowRedirect<Client<HttpConnector, Body>, Limited>,
    target: Uri,
}

impl DownstreamProxy {
    pub fn new(target: Uri) -> Self {
        let client = ServiceBuilder::new()
            .layer(FollowRedirectLayer::with_policy(Limited::new(MAX_REDIRECTS)))
            .service(Client::builder(TokioExecutor::new()).build(HttpConnector::new()));
        Self { client, target }
    }

    pub fn target(&self) -> &Uri {
        &self.target
    }

    /// Call the upstream once and translate its answer.
    pub async fn forward(&self, request_id: Option<HeaderValue>) -> Response {
        tracing::debug!(upstream = %self.target, "Calling upstream");

        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(self.target.clone());
        if let Some(id) = request_id {
            builder = builder.header(X_REQUEST_ID, id);
        }
        let request = match builder.body(Body::empty()) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build upstream request");
                return server_error();
            }
        };

        let response = match self.client.clone().oneshot(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(upstream = %self.target, error = ?e, "Error calling upstream");
                metrics::record_transport_error();
                return server_error();
            }
        };

        let status = response.status();
        let body = read_body(response.into_body()).await;

        if status != StatusCode::OK {
            // The body is drained but otherwise ignored.
            if let Err(e) = body {
                tracing::debug!(
                    status = %status,
                    error = %e,
                    "Discarding unreadable upstream body"
                );
            }
            tracing::info!(status = status.as_u16(), "Upstream returned an error status");
            return plain_text(upstream_error_body(status));
        }

        match body {
            Ok(bytes) => {
                let mut relayed = Vec::with_capacity(RESPONSE_PREFIX.len() + bytes.len());
                relayed.extend_from_slice(RESPONSE_PREFIX);
                relayed.extend_from_slice(&bytes);
                plain_text(relayed)
            }
            Err(e) => {
                tracing::error!(upstream = %self.target, error = %e, "Error reading upstream body");
                metrics::record_transport_error();
                server_error()
            }
        }
    }
}

async fn read_body(body: hyper::body::Incoming) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(Body::new(body), usize::MAX).await
}

/// Handler for every downstream path.
pub async fn downstream_handler(
    State(proxy): State<Arc<DownstreamProxy>>,
    headers: HeaderMap,
) -> Response {
    let start_time = Instant::now();
    tracing::debug!(request_id = %request_id_str(&headers), "Proxying request");

    let response = proxy.forward(request_id(&headers).cloned()).await;
    metrics::record_request("downstream", response.status().as_u16(), start_time);
    response
}
