//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use geocode_gateway::config::GatewayConfig;
use geocode_gateway::{HttpServer, Shutdown};

/// A canned backend reply.
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type", "application/json")],
            body: body.into(),
            delay: Duration::ZERO,
        }
    }
}

/// Start a programmable mock geocoding backend.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]).to_string();
                let request_line = head.lines().next().unwrap_or("").to_string();

                let reply = f(request_line).await;
                tokio::time::sleep(reply.delay).await;

                let status_text = match reply.status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    _ => "200 OK",
                };
                let mut response = format!("HTTP/1.1 {status_text}\r\n");
                for (name, value) in &reply.headers {
                    response.push_str(&format!("{name}: {value}\r\n"));
                }
                response.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    reply.body.len(),
                    reply.body
                ));
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Start a backend that always returns the same JSON body.
pub async fn start_mock_backend(addr: SocketAddr, body: &'static str) {
    start_programmable_backend(addr, move |_| async move { Reply::ok(body) }).await;
}

/// Config pointing at `backend`, listening on `proxy`.
pub fn gateway_config(proxy: SocketAddr, backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = proxy.to_string();
    config.backend.url = format!("http://{backend}");
    config
}

/// Start the gateway and wait until it accepts connections.
pub async fn start_gateway(config: GatewayConfig) -> Shutdown {
    let addr: SocketAddr = config.listener.bind_address.parse().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

/// A client that never reuses connections or honors proxy env vars.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
