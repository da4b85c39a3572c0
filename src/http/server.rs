//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (request ID, tracing)
//! - Identify the client behind each connection
//! - Run the idle bucket sweeper alongside the server
//! - Shut down gracefully on signal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::backend::{BackendError, HttpBackend};
use crate::config::GatewayConfig;
use crate::http::gateway::Gateway;
use crate::http::request::ClientIdentifier;
use crate::http::X_REQUEST_ID;
use crate::observability::metrics;
use crate::security::RateLimiter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway<HttpBackend>>,
    pub identifier: Arc<ClientIdentifier>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: RateLimiter,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, BackendError> {
        let limiter = RateLimiter::new(&config.rate_limit);
        let backend = HttpBackend::new(&config.backend)?;
        let gateway = Gateway::new(&config, limiter.clone(), backend);

        let state = AppState {
            gateway: Arc::new(gateway),
            identifier: Arc::new(ClientIdentifier::new(&config.rate_limit)),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id());

        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.url,
            rate_limit_enabled = self.config.rate_limit.enabled,
            "HTTP server starting"
        );

        tokio::spawn(self.limiter.clone().run_sweeper(shutdown.resubscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Identify the client and hand the request to the gateway.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let client = state.identifier.identify(request.headers(), addr.ip());

    let response = state.gateway.handle(&client, request).await;

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}
