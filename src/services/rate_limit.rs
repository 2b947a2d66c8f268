// src/services/rate_limit.rs
//! Fixed-window request throttling keyed by client address

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed per client per window
    pub limit: u32,
    pub window_seconds: u32,
    pub whitelist_ips: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 10,          // 10 requests per window
            window_seconds: 60, // 60 second window
            whitelist_ips: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // RATE_LIMIT_ENABLED - set to "false" to disable throttling
        if let Ok(enabled) = env::var("RATE_LIMIT_ENABLED") {
            config.enabled = enabled.to_lowercase() != "false";
        }

        // THROTTLER_LIMIT - requests per window per client
        if let Ok(limit) = env::var("THROTTLER_LIMIT") {
            match limit.parse::<u32>() {
                Ok(val) => config.limit = val,
                Err(_) => warn!(value = %limit, "Ignoring invalid THROTTLER_LIMIT"),
            }
        }

        // THROTTLER_TTL - window length in seconds
        if let Ok(ttl) = env::var("THROTTLER_TTL") {
            match ttl.parse::<u32>() {
                Ok(val) if val > 0 => config.window_seconds = val,
                _ => warn!(value = %ttl, "Ignoring invalid THROTTLER_TTL"),
            }
        }

        // RATE_LIMIT_WHITELIST_IPS - comma-separated list of exempt addresses
        if let Ok(whitelist) = env::var("RATE_LIMIT_WHITELIST_IPS") {
            config.whitelist_ips = whitelist
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config
    }

    /// Throttling switched off, for tests and local tooling
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

impl WindowState {
    fn new() -> Self {
        Self {
            count: 1,
            window_start: Instant::now(),
        }
    }

    fn reset(&mut self) {
        self.count = 1;
        self.window_start = Instant::now();
    }

    fn is_expired(&self, window: Duration) -> bool {
        self.window_start.elapsed() >= window
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited { retry_after: u32 },
}

#[derive(Debug, Clone)]
pub struct RateLimitService {
    config: RateLimitConfig,
    windows: Arc<RwLock<HashMap<String, WindowState>>>,
}

impl RateLimitService {
    pub fn new(config: RateLimitConfig) -> Self {
        info!(
            enabled = config.enabled,
            limit = config.limit,
            window_seconds = config.window_seconds,
            whitelist_ips = ?config.whitelist_ips,
            "Initializing RateLimitService"
        );
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn is_whitelisted(&self, ip: &str) -> bool {
        self.config.whitelist_ips.iter().any(|allowed| allowed == ip)
    }

    /// Count one request for `client` and decide whether it may proceed
    pub async fn check(&self, client: &str) -> RateLimitResult {
        if !self.config.enabled || self.is_whitelisted(client) {
            return RateLimitResult::Allowed;
        }

        let window = Duration::from_secs(self.config.window_seconds as u64);
        let mut windows = self.windows.write().await;

        let Some(state) = windows.get_mut(client) else {
            // Expired windows are dropped whenever a new client is tracked
            windows.retain(|_, state| !state.is_expired(window));
            windows.insert(client.to_string(), WindowState::new());
            return RateLimitResult::Allowed;
        };

        if state.is_expired(window) {
            state.reset();
            return RateLimitResult::Allowed;
        }

        if state.count >= self.config.limit {
            let elapsed = state.window_start.elapsed().as_secs() as u32;
            let retry_after = self.config.window_seconds.saturating_sub(elapsed).max(1);
            debug!(client = %client, retry_after = retry_after, "Throttle window exhausted");
            return RateLimitResult::Limited { retry_after };
        }

        state.count += 1;
        RateLimitResult::Allowed
    }
}
