//! Concurrency test: parallel clients never exceed their quota.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::http::StatusCode;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_requests_respect_points() {
    let backend_addr: SocketAddr = "127.0.0.1:28981".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28982".parse().unwrap();
    common::start_mock_backend(backend_addr, "[]").await;

    let mut config = common::gateway_config(proxy_addr, backend_addr);
    config.rate_limit.points = 25;
    config.rate_limit.duration_secs = 3600;
    config.rate_limit.block_duration_secs = 3600;
    let shutdown = common::start_gateway(config).await;

    let client = common::client();
    let start = Instant::now();
    let mut handles = Vec::new();

    for _ in 0..100 {
        let client = client.clone();
        let url = format!("http://{proxy_addr}/search?q=load");
        handles.push(tokio::spawn(async move {
            client
                .get(url)
                .send()
                .await
                .map(|res| res.status())
                .ok()
        }));
    }

    let mut allowed = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Some(StatusCode::OK) => allowed += 1,
            Some(StatusCode::TOO_MANY_REQUESTS) => limited += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    println!("100 requests in {:?}: {allowed} allowed, {limited} limited", start.elapsed());
    assert_eq!(allowed, 25);
    assert_eq!(limited, 75);
    assert!(start.elapsed() < Duration::from_secs(10));

    shutdown.trigger();
}
