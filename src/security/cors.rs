//! CORS policy evaluation.
//!
//! The gateway never refuses a request because of CORS. An origin that is not
//! permitted simply gets no CORS headers and the browser enforces the policy.
//! A wildcard origin is never combined with credentials: in that case the
//! request origin is echoed instead.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method};

use crate::config::CorsConfig;

const WILDCARD: &str = "*";

/// Headers granted to a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsHeaders {
    /// Value for `Access-Control-Allow-Origin`.
    pub allow_origin: HeaderValue,
    /// Whether the request method is in the permitted set.
    pub method_allowed: bool,
    allow_credentials: bool,
    vary_origin: bool,
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
    max_age: HeaderValue,
}

impl CorsHeaders {
    /// Headers for an ordinary (non-preflight) response.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        if self.allow_credentials {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        if self.vary_origin {
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
    }

    /// Headers for a preflight response.
    pub fn apply_preflight(&self, headers: &mut HeaderMap) {
        self.apply(headers);
        if let Some(methods) = &self.allow_methods {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods.clone());
        }
        if let Some(allowed) = &self.allow_headers {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allowed.clone());
        }
        headers.insert(ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
    }
}

/// Evaluates the configured CORS policy per request.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    enabled: bool,
    any_origin: bool,
    origins: Vec<String>,
    methods: Vec<Method>,
    credentials: bool,
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
    max_age: HeaderValue,
}

impl CorsPolicy {
    /// Build from validated config. Entries that fail to parse are skipped.
    pub fn new(config: &CorsConfig) -> Self {
        let methods: Vec<Method> = config
            .methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
            .collect();

        let joined_methods = methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let joined_headers = config.headers.join(", ");

        if config.credentials && config.origins.iter().any(|o| o == WILDCARD) {
            tracing::warn!("CORS wildcard origin with credentials; request origins will be echoed instead of '*'");
        }

        Self {
            enabled: config.enabled,
            any_origin: config.origins.iter().any(|o| o == WILDCARD),
            origins: config.origins.clone(),
            methods,
            credentials: config.credentials,
            allow_methods: non_empty_header(&joined_methods),
            allow_headers: non_empty_header(&joined_headers),
            max_age: HeaderValue::from(config.max_age_secs),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decide the CORS headers for a request from `origin` using `method`.
    ///
    /// Returns `None` when CORS is disabled or the origin is not permitted.
    pub fn evaluate(&self, origin: &str, method: &Method) -> Option<CorsHeaders> {
        if !self.enabled {
            return None;
        }

        let (allow_origin, vary_origin) = if self.any_origin && !self.credentials {
            (HeaderValue::from_static(WILDCARD), false)
        } else if self.any_origin || self.origins.iter().any(|o| o == origin) {
            (HeaderValue::from_str(origin).ok()?, true)
        } else {
            return None;
        };

        Some(CorsHeaders {
            allow_origin,
            method_allowed: self.methods.contains(method),
            allow_credentials: self.credentials,
            vary_origin,
            allow_methods: self.allow_methods.clone(),
            allow_headers: self.allow_headers.clone(),
            max_age: self.max_age.clone(),
        })
    }
}

fn non_empty_header(value: &str) -> Option<HeaderValue> {
    if value.is_empty() {
        None
    } else {
        HeaderValue::from_str(value).ok()
    }
}
