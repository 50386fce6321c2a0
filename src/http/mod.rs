//! HTTP module
//!
//! The client shared by the prober and the notifier:
//! - Retries with constant, linear or exponential backoff
//! - Retry-After handling on 429
//! - Probe pacing through a governor rate limiter

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
