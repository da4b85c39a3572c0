//! Inbound request inspection.
//!
//! # Responsibilities
//! - Identify the client a request is counted against
//! - Recognize CORS preflights
//! - Fill in configured query defaults for geocoding endpoints
//!
//! # Design Decisions
//! - An API key, when configured and present, beats the source address
//! - `X-Forwarded-For` is only honored when explicitly trusted
//! - Client-supplied query parameters are never rewritten

use std::fmt;
use std::net::IpAddr;

use axum::http::header::{ACCESS_CONTROL_REQUEST_METHOD, ORIGIN};
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderName, Method, Request, Uri};

use crate::config::{QueryDefaults, RateLimitConfig};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Identity a request is rate limited under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn from_addr(addr: IpAddr) -> Self {
        Self(format!("ip:{addr}"))
    }

    pub fn from_key(key: &str) -> Self {
        Self(format!("key:{key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives a [`ClientId`] from request headers and the peer address.
#[derive(Debug, Clone, Default)]
pub struct ClientIdentifier {
    key_header: Option<HeaderName>,
    trust_forwarded_for: bool,
}

impl ClientIdentifier {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            key_header: config
                .key_header
                .as_deref()
                .and_then(|name| HeaderName::try_from(name).ok()),
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    pub fn identify(&self, headers: &HeaderMap, peer: IpAddr) -> ClientId {
        if let Some(name) = &self.key_header {
            if let Some(key) = headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|k| !k.is_empty())
            {
                return ClientId::from_key(key);
            }
        }

        if self.trust_forwarded_for {
            if let Some(addr) = headers
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|first| first.trim().parse::<IpAddr>().ok())
            {
                return ClientId::from_addr(addr);
            }
        }

        ClientId::from_addr(peer)
    }
}

/// The method a CORS preflight asks about, if `request` is a preflight.
pub fn preflight_method<B>(request: &Request<B>) -> Option<Method> {
    if request.method() != Method::OPTIONS || !request.headers().contains_key(ORIGIN) {
        return None;
    }
    request
        .headers()
        .get(ACCESS_CONTROL_REQUEST_METHOD)
        .and_then(|v| Method::from_bytes(v.as_bytes()).ok())
}

/// Append default parameters the query does not already carry.
pub fn apply_query_defaults(uri: &Uri, defaults: &[(&'static str, String)]) -> Uri {
    if defaults.is_empty() {
        return uri.clone();
    }

    let query = uri.query().unwrap_or("");
    let present: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').map_or(pair, |(name, _)| name))
        .collect();

    let missing: Vec<String> = defaults
        .iter()
        .filter(|(name, _)| !present.contains(name))
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    if missing.is_empty() {
        return uri.clone();
    }

    let mut new_query = query.to_string();
    for pair in missing {
        if !new_query.is_empty() {
            new_query.push('&');
        }
        new_query.push_str(&pair);
    }

    let mut parts = uri.clone().into_parts();
    match PathAndQuery::try_from(format!("{}?{}", uri.path(), new_query)) {
        Ok(pq) => {
            parts.path_and_query = Some(pq);
            Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
        }
        Err(_) => uri.clone(),
    }
}

/// Query defaults keyed by geocoding endpoint.
#[derive(Debug, Clone, Default)]
pub struct EndpointDefaults {
    search: Vec<(&'static str, String)>,
    reverse: Vec<(&'static str, String)>,
}

impl EndpointDefaults {
    pub fn new(search: &QueryDefaults, reverse: &QueryDefaults) -> Self {
        Self {
            search: search.pairs(),
            reverse: reverse.pairs(),
        }
    }

    /// Defaults for `path`, matching both `/search` and `/search.php` forms.
    pub fn for_path(&self, path: &str) -> &[(&'static str, String)] {
        let endpoint = path.trim_end_matches('/');
        let endpoint = endpoint.strip_suffix(".php").unwrap_or(endpoint);
        match endpoint.rsplit('/').next() {
            Some("search") => &self.search,
            Some("reverse") => &self.reverse,
            _ => &[],
        }
    }
}
