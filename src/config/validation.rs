//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! rules. Validation is a pure function over `GatewayConfig` and reports
//! every problem it finds, not just the first.

use axum::http::{HeaderName, HeaderValue, Method, Uri};
use thiserror::Error;

use crate::config::schema::{GatewayConfig, MAX_RATE_LIMIT_SECS};

/// A single semantic problem, named by the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config
        .listener
        .bind_address
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::new(
            "listener.bind_address",
            "must be a socket address like 0.0.0.0:8080",
        ));
    }

    match config.backend.url.parse::<Uri>() {
        Ok(uri) if uri.scheme_str() == Some("http") && uri.authority().is_some() => {}
        Ok(_) => errors.push(ValidationError::new(
            "backend.url",
            "must be an absolute http:// URL",
        )),
        Err(e) => errors.push(ValidationError::new("backend.url", e.to_string())),
    }
    if config.backend.timeout_ms == 0 {
        errors.push(ValidationError::new("backend.timeout_ms", "must be > 0"));
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.enabled {
        if rate_limit.points == 0 {
            errors.push(ValidationError::new("rate_limit.points", "must be > 0"));
        }
        if rate_limit.duration_secs == 0 {
            errors.push(ValidationError::new("rate_limit.duration_secs", "must be > 0"));
        }
    }
    for (field, secs) in [
        ("rate_limit.duration_secs", rate_limit.duration_secs),
        ("rate_limit.block_duration_secs", rate_limit.block_duration_secs),
        ("rate_limit.sweep_interval_secs", rate_limit.sweep_interval_secs),
    ] {
        if secs > MAX_RATE_LIMIT_SECS {
            errors.push(ValidationError::new(
                field,
                format!("must be <= {MAX_RATE_LIMIT_SECS} (one year)"),
            ));
        }
    }
    if let Some(name) = &rate_limit.key_header {
        if HeaderName::try_from(name.as_str()).is_err() {
            errors.push(ValidationError::new(
                "rate_limit.key_header",
                format!("invalid header name {name:?}"),
            ));
        }
    }

    for (i, method) in config.cors.methods.iter().enumerate() {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("cors.methods[{i}]"),
                format!("invalid method {method:?}"),
            ));
        }
    }
    for (i, header) in config.cors.headers.iter().enumerate() {
        if HeaderName::try_from(header.as_str()).is_err() {
            errors.push(ValidationError::new(
                format!("cors.headers[{i}]"),
                format!("invalid header name {header:?}"),
            ));
        }
    }
    for (i, origin) in config.cors.origins.iter().enumerate() {
        if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::new(
                format!("cors.origins[{i}]"),
                "not a valid header value",
            ));
        }
    }

    for (i, entry) in config.security_headers.iter().enumerate() {
        if HeaderName::try_from(entry.name.as_str()).is_err() {
            errors.push(ValidationError::new(
                format!("security_headers[{i}].name"),
                format!("invalid header name {:?}", entry.name),
            ));
        }
        if HeaderValue::from_str(&entry.value).is_err() {
            errors.push(ValidationError::new(
                format!("security_headers[{i}].value"),
                "not a valid header value",
            ));
        }
    }

    for (section, defaults) in [("search", &config.search), ("reverse", &config.reverse)] {
        let codes = defaults.countrycodes.as_deref().unwrap_or_default();
        for (i, code) in codes.iter().enumerate() {
            if !is_country_code(code) {
                errors.push(ValidationError::new(
                    format!("{section}.countrycodes[{i}]"),
                    format!("{code:?} is not an ISO 3166-1 alpha-2 code"),
                ));
            }
        }
    }

    if let Some(value) = &config.http.cache_control {
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(
                "http.cache_control",
                "not a valid header value",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic())
}
