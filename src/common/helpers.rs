// Helper functions for safe logging and bounded collaborator calls

use std::future::Future;
use std::time::Duration;
use tracing::error;

use super::error::ApiError;

/// Masks email addresses for safe logging
///
/// # Example
/// ```ignore
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 && !parts[0].is_empty() {
            let first = parts[0].chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging. Shows only the first and last 4 characters.
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 && token.is_ascii() {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Runs a store/cache/hashing call under `limit`. An elapsed deadline is a
/// dependency fault and surfaces as `ApiError::InternalServer`; nothing is retried.
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            error!(
                operation = %operation,
                timeout_ms = limit.as_millis() as u64,
                "Operation timed out"
            );
            Err(ApiError::InternalServer(format!("{} timed out", operation)))
        }
    }
}
