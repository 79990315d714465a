//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use fault_harness::config::{LatencyMode, Role, ServiceConfig};
use fault_harness::http::HttpServer;
use fault_harness::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` yields the status code, body, and a delay to wait before answering.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String, Duration)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                // Read the request head before answering.
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;

                let (status, body, delay) = f().await;
                tokio::time::sleep(delay).await;

                let code = StatusCode::from_u16(status).expect("valid status code");
                let status_text = format!(
                    "{} {}",
                    code.as_u16(),
                    code.canonical_reason().unwrap_or("Unknown")
                );

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock backend that always returns `status` with `body`.
#[allow(dead_code)]
pub async fn start_fixed_backend(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (status, body.to_string(), Duration::ZERO) })
        .await
}

/// Start a backend that writes `response` verbatim to every connection and
/// then closes it.
#[allow(dead_code)]
pub async fn start_raw_backend(response: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = Arc::new(response);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let response = response.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a backend that answers every request with `302 Found` to `location`.
#[allow(dead_code)]
pub async fn start_redirect_backend(location: String) -> SocketAddr {
    start_raw_backend(format!(
        "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        location
    ))
    .await
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Run a harness service on an ephemeral port until the returned
/// `Shutdown` is triggered or dropped.
pub async fn start_service(mut config: ServiceConfig) -> (SocketAddr, Shutdown) {
    config.bind_address = "127.0.0.1:0".into();
    let server = HttpServer::new(config).expect("valid test config");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });

    (addr, shutdown)
}

/// Downstream proxy config targeting `upstream`.
#[allow(dead_code)]
pub fn downstream_config(upstream: SocketAddr) -> ServiceConfig {
    ServiceConfig {
        role: Role::Downstream,
        upstream_uri: upstream.to_string(),
        ..Default::default()
    }
}

/// Upstream simulator config with no added latency.
#[allow(dead_code)]
pub fn upstream_config(error_probability: f64, rate_limit: f64) -> ServiceConfig {
    let mut config = ServiceConfig {
        role: Role::Upstream,
        ..Default::default()
    };
    config.upstream.error_probability = error_probability;
    config.upstream.rate_limit = rate_limit;
    config.upstream.latency = LatencyMode::Fixed;
    config.upstream.base_delay_ms = 0;
    config
}

/// A client that opens a fresh connection per request.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// GET `addr` and return status and body.
#[allow(dead_code)]
pub async fn get(client: &reqwest::Client, addr: SocketAddr, path: &str) -> (u16, String) {
    let res = client
        .get(format!("http://{}{}", addr, path))
        .send()
        .await
        .expect("service unreachable");
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}
