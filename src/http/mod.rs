//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → request.rs (client identity, preflight detection)
//!     → gateway.rs (CORS → rate limit → backend → headers)
//!     → error.rs (JSON error bodies for short-circuited requests)
//!     → Send to client
//! ```

pub mod error;
pub mod gateway;
pub mod request;
pub mod server;

pub use error::GatewayError;
pub use gateway::{Gateway, Stage};
pub use request::{ClientId, ClientIdentifier};
pub use server::HttpServer;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";
