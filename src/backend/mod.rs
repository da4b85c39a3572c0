//! Geocoding backend access.
//!
//! # Data Flow
//! ```text
//! Gateway (admitted request)
//!     → Backend::forward
//!         → client.rs (URI rewrite, hop-by-hop strip, hyper request)
//!         → resilience::timeouts (one deadline for the whole exchange)
//!     → buffered response or BackendError
//! ```
//!
//! The gateway depends only on the [`Backend`] trait, so it can be driven by
//! an in-memory backend in tests.

pub mod client;

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use thiserror::Error;

pub use client::HttpBackend;

/// Ways a backend exchange can fail. All of them mean "backend unavailable"
/// to the caller.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("could not connect to backend: {0}")]
    Connect(String),

    #[error("malformed backend response: {0}")]
    Malformed(String),

    #[error("could not build backend request: {0}")]
    InvalidRequest(String),
}

impl BackendError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Timeout(_) => "timeout",
            BackendError::Connect(_) => "connect",
            BackendError::Malformed(_) => "malformed",
            BackendError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// A request/response proxy to the geocoding engine.
pub trait Backend: Send + Sync + 'static {
    fn forward(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, BackendError>> + Send;
}
