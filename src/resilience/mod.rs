//! Resilience subsystem.
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - No automatic retries: a failed backend call surfaces to the caller,
//!   who owns the retry policy

pub mod timeouts;
