//! Admission-control gateway for a geocoding service.
//!
//! Sits in front of a Nominatim-style geocoding engine and decides, per
//! request, which CORS headers apply, whether the client is within its rate
//! limit, and which security headers go on the response. Admitted requests
//! are proxied to the engine under a timeout.

pub mod backend;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
