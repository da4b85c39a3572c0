//! Failure injection tests for the gateway.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;

mod common;

use common::Reply;

#[tokio::test]
async fn test_backend_timeout_is_bounded() {
    let backend_addr: SocketAddr = "127.0.0.1:28181".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28182".parse().unwrap();

    common::start_programmable_backend(backend_addr, |_| async {
        Reply {
            delay: Duration::from_secs(30),
            ..Reply::ok("[]")
        }
    })
    .await;

    let mut config = common::gateway_config(proxy_addr, backend_addr);
    config.backend.timeout_ms = 300;
    let shutdown = common::start_gateway(config).await;

    let started = Instant::now();
    let res = common::client()
        .get(format!("http://{proxy_addr}/search?q=Manila"))
        .send()
        .await
        .expect("Gateway unreachable");
    let elapsed = started.elapsed();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "backend_unavailable");

    shutdown.trigger();
}

#[tokio::test]
async fn test_connection_refused_is_not_retried() {
    // Nothing listens on the backend port.
    let backend_addr: SocketAddr = "127.0.0.1:28281".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28282".parse().unwrap();

    let mut config = common::gateway_config(proxy_addr, backend_addr);
    config.error_handling.include_error_details = true;
    let shutdown = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{proxy_addr}/status"))
        .send()
        .await
        .expect("Gateway unreachable");

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("backend unavailable"), "{message}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_backend_error_status_passes_through() {
    let backend_addr: SocketAddr = "127.0.0.1:28381".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28382".parse().unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    common::start_programmable_backend(backend_addr, move |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Reply {
                status: 500,
                headers: vec![("X-Frame-Options", "ALLOWALL")],
                ..Reply::ok(r#"{"error":"internal"}"#)
            }
        }
    })
    .await;

    let shutdown = common::start_gateway(common::gateway_config(proxy_addr, backend_addr)).await;

    let res = common::client()
        .get(format!("http://{proxy_addr}/search?q=x"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(res.text().await.unwrap(), r#"{"error":"internal"}"#);

    shutdown.trigger();
}
