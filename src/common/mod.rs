//! Common utilities shared by the exchange client
//!
//! - Rate limiter tracking the exchange's decaying call-cost counter

pub mod rate_limiter;

pub use rate_limiter::{CostLimiter, RateLimiter, RateLimiterConfig};
