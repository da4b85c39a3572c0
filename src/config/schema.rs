//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Geocoding backend the gateway fronts.
    pub backend: BackendConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin resource sharing policy.
    pub cors: CorsConfig,

    /// Static headers appended to every response.
    pub security_headers: Vec<HeaderEntry>,

    /// Request size limits.
    pub security: SecurityConfig,

    /// HTTP caching hints for successful responses.
    pub http: HttpCacheConfig,

    /// Default parameters for `/search` requests.
    pub search: QueryDefaults,

    /// Default parameters for `/reverse` requests.
    pub reverse: QueryDefaults,

    pub error_handling: ErrorHandlingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Log level shared with the geocoding engine (e.g. "WARNING").
    pub log_level: Option<String>,

    /// Data store tuning, forwarded verbatim.
    pub database: toml::Table,

    /// Import pipeline options, forwarded verbatim.
    pub import: toml::Table,

    /// Output formatting options, forwarded verbatim.
    pub output: toml::Table,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            backend: BackendConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            security_headers: default_security_headers(),
            security: SecurityConfig::default(),
            http: HttpCacheConfig::default(),
            search: QueryDefaults::default(),
            reverse: QueryDefaults::default(),
            error_handling: ErrorHandlingConfig::default(),
            observability: ObservabilityConfig::default(),
            log_level: None,
            database: toml::Table::new(),
            import: toml::Table::new(),
            output: toml::Table::new(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the geocoding engine (e.g., "http://127.0.0.1:8081").
    pub url: String,

    /// Deadline for a complete backend exchange, in milliseconds.
    pub timeout_ms: u64,

    /// Largest backend response body accepted, in bytes.
    pub max_response_bytes: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8081".to_string(),
            timeout_ms: 5_000,
            max_response_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Upper bound for any rate limit window, block or sweep interval (one year).
pub const MAX_RATE_LIMIT_SECS: u64 = 365 * 24 * 60 * 60;

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per window per client.
    pub points: u32,

    /// Window length in seconds.
    pub duration_secs: u64,

    /// How long a client stays blocked after exceeding the window, in seconds.
    pub block_duration_secs: u64,

    /// Interval between idle bucket sweeps. Zero means `duration_secs`.
    pub sweep_interval_secs: u64,

    /// Header carrying an API key. When present on a request, the key
    /// identifies the client instead of its address.
    pub key_header: Option<String>,

    /// Use the first `X-Forwarded-For` hop as the client address.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            points: 100,
            duration_secs: 60,
            block_duration_secs: 60,
            sweep_interval_secs: 0,
            key_header: None,
            trust_forwarded_for: false,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,

    /// Allowed origins. `"*"` allows any origin.
    pub origins: Vec<String>,

    pub methods: Vec<String>,

    pub headers: Vec<String>,

    /// Whether browsers may send credentials.
    pub credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["*".to_string()],
            methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            headers: vec!["Content-Type".to_string(), "Accept".to_string()],
            credentials: false,
            max_age_secs: 86_400,
        }
    }
}

/// A single static response header.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Baseline headers used when the config file does not list any.
pub fn default_security_headers() -> Vec<HeaderEntry> {
    vec![
        HeaderEntry::new("X-Content-Type-Options", "nosniff"),
        HeaderEntry::new("X-Frame-Options", "DENY"),
        HeaderEntry::new("Referrer-Policy", "strict-origin-when-cross-origin"),
        HeaderEntry::new("Content-Security-Policy", "default-src 'none'"),
    ]
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024,
        }
    }
}

/// HTTP caching configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HttpCacheConfig {
    /// `Cache-Control` value for successful responses that lack one.
    pub cache_control: Option<String>,
}

/// Default query parameters for a geocoding endpoint.
///
/// Each field is only sent when the client left the parameter out.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct QueryDefaults {
    pub limit: Option<u32>,
    pub addressdetails: Option<bool>,
    pub countrycodes: Option<Vec<String>>,
    pub dedupe: Option<bool>,
    pub zoom: Option<u8>,
}

impl QueryDefaults {
    /// Flatten into `(name, value)` query pairs in a stable order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(details) = self.addressdetails {
            pairs.push(("addressdetails", u8::from(details).to_string()));
        }
        if let Some(codes) = &self.countrycodes {
            if !codes.is_empty() {
                pairs.push(("countrycodes", codes.join(",")));
            }
        }
        if let Some(dedupe) = self.dedupe {
            pairs.push(("dedupe", u8::from(dedupe).to_string()));
        }
        if let Some(zoom) = self.zoom {
            pairs.push(("zoom", zoom.to_string()));
        }
        pairs
    }
}

/// Error response configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ErrorHandlingConfig {
    /// Expose error causes to callers. Causes are always logged.
    pub include_error_details: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Render the sections owned by external collaborators back to TOML.
    pub fn passthrough_toml(&self) -> Result<String, toml::ser::Error> {
        let mut table = toml::Table::new();
        if let Some(level) = &self.log_level {
            table.insert("log_level".to_string(), toml::Value::String(level.clone()));
        }
        for (name, section) in [
            ("database", &self.database),
            ("import", &self.import),
            ("output", &self.output),
        ] {
            if !section.is_empty() {
                table.insert(name.to_string(), toml::Value::Table(section.clone()));
            }
        }
        toml::to_string(&table)
    }
}
