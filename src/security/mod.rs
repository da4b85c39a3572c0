//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (decide CORS headers for the origin)
//!     → rate_limit.rs (per-client admission)
//!     → Pass to backend
//! Outgoing response:
//!     → headers.rs (static security headers, always)
//! ```
//!
//! # Design Decisions
//! - CORS only withholds headers; browsers enforce it
//! - Rate limiting fails closed: an over-quota client is blocked for a while
//! - Security headers are applied to error responses too

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::{CorsHeaders, CorsPolicy};
pub use headers::SecurityHeaders;
pub use rate_limit::{Decision, RateLimiter};
