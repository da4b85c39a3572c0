//! End-to-end admission tests: CORS, rate limiting and response headers.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use geocode_gateway::config::QueryDefaults;

mod common;

use common::Reply;

const MANILA: &str = r#"[{"lat":"14.5906","lon":"120.9799","display_name":"Manila"}]"#;

#[tokio::test]
async fn test_third_request_in_window_is_rate_limited() {
    let backend_addr: SocketAddr = "127.0.0.1:28481".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28482".parse().unwrap();
    common::start_mock_backend(backend_addr, MANILA).await;

    let mut config = common::gateway_config(proxy_addr, backend_addr);
    config.rate_limit.points = 2;
    config.rate_limit.duration_secs = 60;
    config.rate_limit.block_duration_secs = 45;
    let shutdown = common::start_gateway(config).await;

    let client = common::client();
    let url = format!("http://{proxy_addr}/search?q=Manila&format=json");

    for _ in 0..2 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), MANILA);
    }

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after <= 45);
    assert_eq!(res.headers()["x-frame-options"], "DENY");

    shutdown.trigger();
}

#[tokio::test]
async fn test_api_keys_are_limited_separately() {
    let backend_addr: SocketAddr = "127.0.0.1:28581".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28582".parse().unwrap();
    common::start_mock_backend(backend_addr, MANILA).await;

    let mut config = common::gateway_config(proxy_addr, backend_addr);
    config.rate_limit.points = 1;
    config.rate_limit.key_header = Some("x-api-key".into());
    let shutdown = common::start_gateway(config).await;

    let client = common::client();
    let url = format!("http://{proxy_addr}/status");

    let first = client.get(&url).header("x-api-key", "alpha").send().await.unwrap();
    let second = client.get(&url).header("x-api-key", "alpha").send().await.unwrap();
    let other = client.get(&url).header("x-api-key", "beta").send().await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(other.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_preflight_and_simple_cors() {
    let backend_addr: SocketAddr = "127.0.0.1:28681".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28682".parse().unwrap();
    common::start_mock_backend(backend_addr, MANILA).await;

    let mut config = common::gateway_config(proxy_addr, backend_addr);
    config.cors.origins = vec!["https://clinic.example".into()];
    config.cors.credentials = true;
    let shutdown = common::start_gateway(config).await;

    let client = common::client();
    let url = format!("http://{proxy_addr}/search?q=Manila");

    let preflight = client
        .request(reqwest::Method::OPTIONS, &url)
        .header("origin", "https://clinic.example")
        .header("access-control-request-method", "GET")
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        preflight.headers()["access-control-allow-origin"],
        "https://clinic.example"
    );
    assert_eq!(preflight.headers()["access-control-allow-credentials"], "true");
    assert!(preflight.headers().contains_key("access-control-max-age"));

    let simple = client
        .get(&url)
        .header("origin", "https://clinic.example")
        .send()
        .await
        .unwrap();
    assert_eq!(simple.status(), StatusCode::OK);
    assert_eq!(simple.headers()["access-control-allow-origin"], "https://clinic.example");
    assert!(!simple.headers().contains_key("access-control-max-age"));

    let foreign = client
        .get(&url)
        .header("origin", "https://elsewhere.example")
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status(), StatusCode::OK);
    assert!(!foreign.headers().contains_key("access-control-allow-origin"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_and_cache_headers() {
    let backend_addr: SocketAddr = "127.0.0.1:28781".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28782".parse().unwrap();
    common::start_mock_backend(backend_addr, MANILA).await;

    let mut config = common::gateway_config(proxy_addr, backend_addr);
    config.http.cache_control = Some("public, max-age=3600".into());
    let shutdown = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{proxy_addr}/search?q=Manila"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["cache-control"], "public, max-age=3600");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.headers()["content-type"], "application/json");

    shutdown.trigger();
}

#[tokio::test]
async fn test_search_defaults_reach_backend() {
    let backend_addr: SocketAddr = "127.0.0.1:28881".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28882".parse().unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    common::start_programmable_backend(backend_addr, move |request_line| {
        recorder.lock().unwrap().push(request_line);
        async { Reply::ok(MANILA) }
    })
    .await;

    let mut config = common::gateway_config(proxy_addr, backend_addr);
    config.search = QueryDefaults {
        limit: Some(10),
        addressdetails: Some(true),
        countrycodes: Some(vec!["ph".into()]),
        ..QueryDefaults::default()
    };
    let shutdown = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{proxy_addr}/search?q=Manila&limit=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[0],
        "GET /search?q=Manila&limit=1&addressdetails=1&countrycodes=ph HTTP/1.1"
    );

    shutdown.trigger();
}
