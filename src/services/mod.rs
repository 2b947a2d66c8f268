// src/services/mod.rs
//
// Shared services used across domain modules

pub mod metrics;
pub mod rate_limit;

// Re-export commonly used types for convenience
pub use metrics::{AuthEvent, AuthMetrics};
pub use rate_limit::{RateLimitConfig, RateLimitService};
