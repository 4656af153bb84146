//! # LMS Common Library
//!
//! Shared code for the LMS audit services including:
//! - Common error types
//! - API credential configuration
//! - Clock abstraction for deterministic time-dependent logic
//! - TTL cache and fixed-window rate limiter

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod rate_limit;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
