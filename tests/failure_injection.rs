//! Failure handling of the downstream proxy against mock upstreams.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

mod common;

#[tokio::test]
async fn upstream_error_status_becomes_descriptive_200() {
    let upstream = common::start_fixed_backend(503, "Service Unavailable").await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let (status, body) = common::get(&common::client(), proxy, "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, "Received error 503 from server");
}

#[tokio::test]
async fn upstream_error_body_is_not_relayed() {
    let upstream = common::start_fixed_backend(500, "stack trace goes here").await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let (status, body) = common::get(&common::client(), proxy, "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, "Received error 500 from server");
}

#[tokio::test]
async fn upstream_404_is_also_an_error() {
    let upstream = common::start_fixed_backend(404, "").await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let (status, body) = common::get(&common::client(), proxy, "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, "Received error 404 from server");
}

#[tokio::test]
async fn upstream_body_is_relayed_with_prefix() {
    let upstream = common::start_fixed_backend(200, "hello").await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let (status, body) = common::get(&common::client(), proxy, "/any/path").await;
    assert_eq!(status, 200);
    assert_eq!(body, "Response hello");
}

#[tokio::test]
async fn unreachable_upstream_is_an_empty_500() {
    let upstream = common::unreachable_addr().await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let (status, body) = common::get(&common::client(), proxy, "/").await;
    assert_eq!(status, 500);
    assert!(body.is_empty());
}

#[tokio::test]
async fn unreachable_upstream_outcome_is_stable() {
    let upstream = common::unreachable_addr().await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;
    let client = common::client();

    for _ in 0..10 {
        let (status, body) = common::get(&client, proxy, "/").await;
        assert_eq!(status, 500);
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn exactly_one_upstream_call_per_request() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let upstream = common::start_programmable_backend(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (503, "busy".to_string(), Duration::ZERO)
        }
    })
    .await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;
    let client = common::client();

    for _ in 0..5 {
        let (status, _) = common::get(&client, proxy, "/").await;
        assert_eq!(status, 200);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 5, "no retries expected");
}

#[tokio::test]
async fn slow_upstream_is_waited_for() {
    let upstream = common::start_programmable_backend(|| async {
        (200, "slow".to_string(), Duration::from_millis(2500))
    })
    .await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let start = Instant::now();
    let (status, body) = common::get(&common::client(), proxy, "/").await;
    assert!(start.elapsed() >= Duration::from_millis(2500));
    assert_eq!(status, 200);
    assert_eq!(body, "Response slow");
}

#[tokio::test]
async fn request_id_is_forwarded_upstream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let n = socket.read(&mut buf).await.unwrap();
        let _ = tx.send(String::from_utf8_lossy(&buf[..n]).to_lowercase());
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
            .await;
    });
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let res = common::client()
        .get(format!("http://{}/", proxy))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");
    assert_eq!(res.text().await.unwrap(), "Response ok");

    let head = rx.await.unwrap();
    assert!(head.starts_with("get / http/1.1"), "{head}");
    assert!(head.contains("x-request-id: trace-me"), "{head}");
}

#[tokio::test]
async fn unlisted_upstream_status_is_reported_verbatim() {
    let upstream = common::start_fixed_backend(418, "teapot").await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let (status, body) = common::get(&common::client(), proxy, "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, "Received error 418 from server");
}

#[tokio::test]
async fn upstream_redirect_is_followed() {
    let target = common::start_fixed_backend(200, "final").await;
    let upstream = common::start_redirect_backend(format!("http://{}/", target)).await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let (status, body) = common::get(&common::client(), proxy, "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, "Response final");
}

#[tokio::test]
async fn endless_redirects_stop_at_the_hop_limit() {
    // Relative location: the backend redirects to itself forever.
    let upstream = common::start_redirect_backend("/again".to_string()).await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let (status, body) = common::get(&common::client(), proxy, "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, "Received error 302 from server");
}

#[tokio::test]
async fn truncated_upstream_body_is_an_empty_500() {
    let upstream = common::start_raw_backend(
        "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort".to_string(),
    )
    .await;
    let (proxy, _shutdown) = common::start_service(common::downstream_config(upstream)).await;

    let (status, body) = common::get(&common::client(), proxy, "/").await;
    assert_eq!(status, 500);
    assert!(body.is_empty());
}
