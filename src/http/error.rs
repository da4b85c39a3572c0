//! Gateway error responses.
//!
//! Errors are turned into JSON bodies at the gateway boundary. The caller sees
//! the cause only when `include_error_details` is on; it is always logged.

use std::time::Duration;

use axum::http::header::{HeaderValue, RETRY_AFTER};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;
use crate::security::rate_limit::retry_after_secs;

/// Failures the gateway answers on the backend's behalf.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("rate limit exceeded, retry after {}s", whole_secs(.retry_after))]
    RateLimited { retry_after: Duration },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

fn whole_secs(wait: &Duration) -> u64 {
    retry_after_secs(*wait)
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::BackendUnavailable(_) => "backend_unavailable",
            GatewayError::PayloadTooLarge { .. } => "payload_too_large",
        }
    }

    fn generic_message(&self) -> &'static str {
        match self {
            GatewayError::RateLimited { .. } => "Too many requests",
            GatewayError::BackendUnavailable(_) => "Geocoding service unavailable",
            GatewayError::PayloadTooLarge { .. } => "Request body too large",
        }
    }

    /// Build the client-facing response.
    pub fn to_response(&self, include_details: bool) -> Response {
        let message = if include_details {
            self.to_string()
        } else {
            self.generic_message().to_string()
        };

        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });

        let mut response = (self.status(), Json(body)).into_response();
        if let GatewayError::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(*retry_after)));
        }
        response
    }
}
