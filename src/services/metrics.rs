// src/services/metrics.rs
//! Auth event counters with Prometheus text exposition
//!
//! One `AuthMetrics` handle is built in `main` and injected wherever events are
//! recorded. Recording never fails and never blocks.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    AuthRequest,
    LoginFailure,
    RefreshFailure,
    Logout,
    UserRequest,
    UserCreation,
    UserFindById,
}

impl AuthEvent {
    const ALL: [AuthEvent; 7] = [
        AuthEvent::AuthRequest,
        AuthEvent::LoginFailure,
        AuthEvent::RefreshFailure,
        AuthEvent::Logout,
        AuthEvent::UserRequest,
        AuthEvent::UserCreation,
        AuthEvent::UserFindById,
    ];

    pub fn metric_name(&self) -> &'static str {
        match self {
            AuthEvent::AuthRequest => "auth_requests_total",
            AuthEvent::LoginFailure => "auth_login_failures_total",
            AuthEvent::RefreshFailure => "auth_refresh_failures_total",
            AuthEvent::Logout => "auth_logout_total",
            AuthEvent::UserRequest => "user_requests_total",
            AuthEvent::UserCreation => "user_creation_total",
            AuthEvent::UserFindById => "user_find_by_id_total",
        }
    }

    fn help(&self) -> &'static str {
        match self {
            AuthEvent::AuthRequest => "Total number of authentication requests",
            AuthEvent::LoginFailure => "Total number of failed login attempts",
            AuthEvent::RefreshFailure => "Total number of failed refresh token attempts",
            AuthEvent::Logout => "Total number of logout attempts",
            AuthEvent::UserRequest => "Total number of requests related to users",
            AuthEvent::UserCreation => "Total number of user creation attempts",
            AuthEvent::UserFindById => "Total number of requests to find users by ID",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Default)]
pub struct AuthMetrics {
    counters: [AtomicU64; 7],
}

impl AuthMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: AuthEvent) {
        self.counters[event.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, event: AuthEvent) -> u64 {
        self.counters[event.index()].load(Ordering::Relaxed)
    }

    /// Prometheus text format (version 0.0.4)
    pub fn render(&self) -> String {
        let mut out = String::new();
        for event in AuthEvent::ALL {
            let name = event.metric_name();
            let _ = writeln!(out, "# HELP {} {}", name, event.help());
            let _ = writeln!(out, "# TYPE {} counter", name);
            let _ = writeln!(out, "{} {}", name, self.get(event));
        }
        out
    }
}
