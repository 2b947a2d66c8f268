// Common module - shared types and utilities across all modules

pub mod config;
pub mod error;
pub mod helpers;
pub mod migrations;
pub mod state;
pub mod validation;

// Re-export commonly used types for convenience
pub use config::AuthConfig;
pub use error::{ApiError, INVALID_CREDENTIALS};
pub use helpers::{safe_email_log, safe_token_log, with_timeout};
pub use state::AppState;
pub use validation::{ValidationError, ValidationResult, Validator};
