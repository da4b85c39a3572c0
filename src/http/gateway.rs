//! Request admission and proxying.
//!
//! # State Machine
//! ```text
//! Received → CorsChecked → RateChecked → Proxied → Responded
//!     │            │             │           │
//!     └────────────┴─────────────┴───────────┴──→ Error (logged with stage)
//! ```
//!
//! - Preflights are answered at `CorsChecked` and never reach the backend
//! - A denied admission ends at `RateChecked` with 429 + `Retry-After`
//! - Bodies over `max_body_size`, declared or streamed, end at `Proxied` with 413
//! - Backend failures end at `Proxied` with 502; there are no retries
//! - Security headers are applied to every response, error or not

use std::fmt;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, ORIGIN};
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::backend::Backend;
use crate::config::GatewayConfig;
use crate::http::error::GatewayError;
use crate::http::request::{apply_query_defaults, preflight_method, ClientId, EndpointDefaults};
use crate::observability::metrics;
use crate::security::rate_limit::retry_after_secs;
use crate::security::{CorsHeaders, CorsPolicy, Decision, RateLimiter, SecurityHeaders};

/// Processing stage of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    CorsChecked,
    RateChecked,
    Proxied,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::CorsChecked => "cors_checked",
            Stage::RateChecked => "rate_checked",
            Stage::Proxied => "proxied",
            Stage::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// Admission control in front of a geocoding backend.
pub struct Gateway<B> {
    cors: CorsPolicy,
    limiter: RateLimiter,
    security_headers: SecurityHeaders,
    cache_control: Option<HeaderValue>,
    query_defaults: EndpointDefaults,
    max_body_size: usize,
    include_error_details: bool,
    backend: B,
}

impl<B: Backend> Gateway<B> {
    pub fn new(config: &GatewayConfig, limiter: RateLimiter, backend: B) -> Self {
        Self {
            cors: CorsPolicy::new(&config.cors),
            limiter,
            security_headers: SecurityHeaders::new(&config.security_headers),
            cache_control: config
                .http
                .cache_control
                .as_deref()
                .and_then(|v| HeaderValue::from_str(v).ok()),
            query_defaults: EndpointDefaults::new(&config.search, &config.reverse),
            max_body_size: config.security.max_body_size,
            include_error_details: config.error_handling.include_error_details,
            backend,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Run one request through admission and, if admitted, the backend.
    pub async fn handle(&self, client: &ClientId, request: Request<Body>) -> Response {
        tracing::trace!(
            client = %client,
            stage = %Stage::Received,
            method = %request.method(),
            path = request.uri().path(),
            "Request received"
        );
        let origin = request
            .headers()
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let preflight = if self.cors.is_enabled() {
            preflight_method(&request)
        } else {
            None
        };

        let cors = origin.as_deref().and_then(|origin| {
            let method = preflight.as_ref().unwrap_or(request.method());
            let headers = self.cors.evaluate(origin, method);
            if headers.is_none() && self.cors.is_enabled() {
                tracing::debug!(
                    client = %client,
                    stage = %Stage::CorsChecked,
                    origin,
                    "Origin not permitted by CORS policy"
                );
            }
            headers
        });

        if let Some(method) = preflight {
            return self.preflight_response(client, &method, cors.as_ref());
        }

        if let Decision::Deny { retry_after } = self.limiter.admit(client.as_str()) {
            metrics::record_rate_limited();
            tracing::warn!(
                client = %client,
                retry_after_secs = retry_after_secs(retry_after),
                "Rate limit exceeded"
            );
            return self.fail(
                client,
                Stage::RateChecked,
                GatewayError::RateLimited { retry_after },
                cors.as_ref(),
            );
        }

        let request = match self.limit_body(request).await {
            Ok(request) => request,
            Err(e) => return self.fail(client, Stage::Proxied, e, cors.as_ref()),
        };

        let request = self.with_query_defaults(request);
        let mut response = match self.backend.forward(request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_backend_failure(e.kind());
                return self.fail(
                    client,
                    Stage::Proxied,
                    GatewayError::BackendUnavailable(e),
                    cors.as_ref(),
                );
            }
        };

        tracing::debug!(
            client = %client,
            stage = %Stage::Responded,
            status = %response.status(),
            "Backend responded"
        );
        if let Some(cors) = &cors {
            cors.apply(response.headers_mut());
        }
        if response.status().is_success() && !response.headers().contains_key(CACHE_CONTROL) {
            if let Some(value) = &self.cache_control {
                response.headers_mut().insert(CACHE_CONTROL, value.clone());
            }
        }
        self.security_headers.apply(response)
    }

    fn preflight_response(
        &self,
        client: &ClientId,
        method: &Method,
        cors: Option<&CorsHeaders>,
    ) -> Response {
        let permitted = cors.is_some_and(|c| c.method_allowed);
        if !permitted {
            tracing::debug!(
                client = %client,
                stage = %Stage::CorsChecked,
                method = %method,
                "Preflight not permitted"
            );
        }

        let status = if permitted {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::FORBIDDEN
        };
        let mut response = status.into_response();
        if let Some(cors) = cors {
            cors.apply_preflight(response.headers_mut());
        }
        self.security_headers.apply(response)
    }

    fn fail(
        &self,
        client: &ClientId,
        stage: Stage,
        error: GatewayError,
        cors: Option<&CorsHeaders>,
    ) -> Response {
        if !matches!(error, GatewayError::RateLimited { .. }) {
            tracing::error!(client = %client, stage = %stage, error = %error, "Request failed");
        }

        let mut response = error.to_response(self.include_error_details);
        if let Some(cors) = cors {
            cors.apply(response.headers_mut());
        }
        self.security_headers.apply(response)
    }

    /// Buffer the request body, refusing anything over `max_body_size`.
    ///
    /// A declared `Content-Length` over the limit is refused without reading.
    /// Bodies without one (chunked or streamed) are read up to the limit.
    async fn limit_body(&self, request: Request<Body>) -> Result<Request<Body>, GatewayError> {
        let too_large = GatewayError::PayloadTooLarge {
            limit: self.max_body_size,
        };
        if declared_length(&request).is_some_and(|length| length > self.max_body_size) {
            return Err(too_large);
        }

        let (parts, body) = request.into_parts();
        match axum::body::to_bytes(body, self.max_body_size).await {
            Ok(bytes) => Ok(Request::from_parts(parts, Body::from(bytes))),
            Err(e) => {
                tracing::debug!(error = %e, limit = self.max_body_size, "Request body rejected");
                Err(too_large)
            }
        }
    }

    fn with_query_defaults(&self, mut request: Request<Body>) -> Request<Body> {
        let defaults = self.query_defaults.for_path(request.uri().path());
        if !defaults.is_empty() {
            let uri = apply_query_defaults(request.uri(), defaults);
            *request.uri_mut() = uri;
        }
        request
    }
}

fn declared_length<B>(request: &Request<B>) -> Option<usize> {
    request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
