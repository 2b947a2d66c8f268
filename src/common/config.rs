// src/common/config.rs
//! Environment-driven configuration for the auth core

use std::env;
use std::time::Duration;
use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "replace_with_strong_secret";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub access_token_expires_in: u64,
    /// Refresh token lifetime in seconds
    pub refresh_token_expires_in: u64,
    pub bcrypt_cost: u32,
    pub redis_url: Option<String>,
    /// Upper bound for every hashing, store and cache call
    pub operation_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            access_token_expires_in: 3600,    // 1 hour
            refresh_token_expires_in: 604800, // 7 days
            bcrypt_cost: 10,
            redis_url: None,
            operation_timeout: Duration::from_millis(5000),
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => config.jwt_secret = secret,
            _ => warn!("JWT_SECRET not set, falling back to the built-in development secret"),
        }

        if let Some(val) = parse_var::<u64>("JWT_ACCESS_TOKEN_EXPIRES_IN") {
            config.access_token_expires_in = val;
        }

        if let Some(val) = parse_var::<u64>("JWT_REFRESH_TOKEN_EXPIRES_IN") {
            config.refresh_token_expires_in = val;
        }

        // BCRYPT_SALT_ROUNDS - bcrypt cost factor (4..=31)
        if let Some(val) = parse_var::<u32>("BCRYPT_SALT_ROUNDS") {
            config.bcrypt_cost = val;
        }

        config.redis_url = env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty());

        if let Some(ms) = parse_var::<u64>("AUTH_OPERATION_TIMEOUT_MS") {
            config.operation_timeout = Duration::from_millis(ms);
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(val) => Some(val),
        Err(_) => {
            warn!(key = %key, value = %raw, "Ignoring unparsable environment value");
            None
        }
    }
}
