// src/users/validators.rs

use super::models::{ChangePasswordRequest, CreateUserRequest};
use crate::auth::oauth_mapper::PLACEHOLDER_EMAIL_DOMAIN;
use crate::common::{ValidationResult, Validator};

// ============================================================================
// Password policy
// ============================================================================

pub const MIN_PASSWORD_LEN: usize = 8;

/// At least 8 characters with a digit, a lower-case letter, an upper-case
/// letter and a special character.
pub fn check_password_policy(result: &mut ValidationResult, field: &str, password: &str) {
    let password = password.trim();

    if password.chars().count() < MIN_PASSWORD_LEN {
        result.add_error(field, "Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        result.add_error(field, "Password must contain at least one number");
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        result.add_error(field, "Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        result.add_error(field, "Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        result.add_error(field, "Password must contain at least one special character");
    }
}

fn looks_like_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

fn has_reserved_domain(email: &str) -> bool {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.eq_ignore_ascii_case(PLACEHOLDER_EMAIL_DOMAIN))
        .unwrap_or(false)
}

// ============================================================================
// Request validators
// ============================================================================

pub struct CreateUserValidator;

impl Validator<CreateUserRequest> for CreateUserValidator {
    fn validate(&self, data: &CreateUserRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.username.trim().is_empty() {
            result.add_error("username", "Username is required");
        } else if data.username.len() > 255 {
            result.add_error("username", "Username must be less than 255 characters");
        }

        if !looks_like_email(&data.email) {
            result.add_error("email", "Email must be a valid email address");
        } else if has_reserved_domain(&data.email) {
            result.add_error("email", "Email domain is reserved");
        }

        check_password_policy(&mut result, "password", &data.password);

        result
    }
}

pub struct ChangePasswordValidator;

impl Validator<ChangePasswordRequest> for ChangePasswordValidator {
    fn validate(&self, data: &ChangePasswordRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.current_password.trim().is_empty() {
            result.add_error("currentPassword", "Current password is required");
        }

        check_password_policy(&mut result, "newPassword", &data.new_password);

        result
    }
}
