//! Token service: password hashing, JWT signing/verification and revocation

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::models::{Claims, TokenPair, TokenSubject};
use super::revocation::RevocationCache;
use crate::common::{safe_token_log, with_timeout, ApiError, AuthConfig};

const REVOKED_MARKER: &str = "revoked";
const REVOCATION_PREFIX: &str = "blacklist:";

/// Whitespace around a password is never significant. Both the hashing and the
/// verification path go through here.
pub fn normalize_password(plaintext: &str) -> &str {
    plaintext.trim()
}

pub struct TokenService {
    secret: String,
    access_expires_in: u64,
    refresh_expires_in: u64,
    bcrypt_cost: u32,
    timeout: Duration,
    cache: Arc<dyn RevocationCache>,
}

impl TokenService {
    pub fn new(config: &AuthConfig, cache: Arc<dyn RevocationCache>) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_expires_in: config.access_token_expires_in,
            refresh_expires_in: config.refresh_token_expires_in,
            bcrypt_cost: config.bcrypt_cost,
            timeout: config.operation_timeout,
            cache,
        }
    }

    // ---- Passwords ----

    pub async fn hash_password(&self, plaintext: &str) -> Result<String, ApiError> {
        let password = normalize_password(plaintext).to_string();
        let cost = self.bcrypt_cost;

        with_timeout("password hashing", self.timeout, async move {
            tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
                .await
                .map_err(|e| ApiError::InternalServer(format!("hashing task failed: {}", e)))?
                .map_err(|e| {
                    error!(error = %e, "bcrypt hashing failed");
                    ApiError::InternalServer("password hashing failed".to_string())
                })
        })
        .await
    }

    /// A malformed stored hash verifies as `false` rather than erroring.
    pub async fn verify_password(&self, plaintext: &str, hash: &str) -> Result<bool, ApiError> {
        let password = normalize_password(plaintext).to_string();
        let hash = hash.trim().to_string();

        with_timeout("password verification", self.timeout, async move {
            let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
                .await
                .map_err(|e| ApiError::InternalServer(format!("verify task failed: {}", e)))?;

            match outcome {
                Ok(valid) => Ok(valid),
                Err(e) => {
                    warn!(error = %e, "Stored password hash could not be parsed");
                    Ok(false)
                }
            }
        })
        .await
    }

    // ---- JWT ----

    pub fn issue_token_pair(&self, subject: &TokenSubject) -> Result<TokenPair, ApiError> {
        Ok(TokenPair {
            access_token: self.sign(subject, self.access_expires_in)?,
            refresh_token: self.sign(subject, self.refresh_expires_in)?,
        })
    }

    pub fn issue_access_token(&self, subject: &TokenSubject) -> Result<String, ApiError> {
        self.sign(subject, self.access_expires_in)
    }

    fn sign(&self, subject: &TokenSubject, expires_in: u64) -> Result<String, ApiError> {
        let now = Utc::now().timestamp() as usize;
        let exp = usize::try_from(expires_in)
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(|secs| now.checked_add(secs))
            .ok_or_else(|| {
                error!(expires_in = expires_in, "Token expiry is misconfigured");
                ApiError::InternalServer(
                    "Token expiration time is not configured correctly.".to_string(),
                )
            })?;

        let claims = Claims {
            sub: subject.user_id.to_string(),
            username: subject.username.clone(),
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            error!(error = %e, user_id = subject.user_id, "JWT encoding error");
            ApiError::InternalServer("jwt error".to_string())
        })
    }

    /// Checks signature and expiry, and that the token names a user.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        // No leeway: a revocation entry expires together with its token.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            debug!(error = %e, token = %safe_token_log(token), "JWT validation failed");
            ApiError::Unauthorized("Invalid token".to_string())
        })?;

        let claims = decoded.claims;
        if claims.username.is_empty() || claims.user_id().is_none() {
            warn!("Token payload is missing sub or username");
            return Err(ApiError::Unauthorized("Token payload is invalid".to_string()));
        }

        Ok(claims)
    }

    // ---- Revocation ----

    /// The entry lives exactly as long as the token would have.
    pub async fn revoke(&self, token: &str) -> Result<(), ApiError> {
        let claims = self.verify_token(token)?;

        let now = Utc::now().timestamp();
        let remaining = claims.exp as i64 - now;
        if remaining <= 0 {
            debug!(token = %safe_token_log(token), "Token already expired, nothing to revoke");
            return Ok(());
        }

        // One extra second covers the token's final whole second of validity.
        let ttl = remaining as u64 + 1;
        let key = revocation_key(token);
        with_timeout("revocation write", self.timeout, async {
            self.cache
                .set_with_ttl(&key, REVOKED_MARKER, ttl)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to write revocation entry");
                    ApiError::InternalServer("revocation cache unavailable".to_string())
                })
        })
        .await?;

        debug!(
            token = %safe_token_log(token),
            ttl_seconds = ttl,
            "Token revoked"
        );
        Ok(())
    }

    /// Fails closed: a cache fault is an error, not "not revoked".
    pub async fn is_revoked(&self, token: &str) -> Result<bool, ApiError> {
        let key = revocation_key(token);
        let value = with_timeout("revocation lookup", self.timeout, async {
            self.cache.get(&key).await.map_err(|e| {
                error!(error = %e, "Failed to read revocation entry");
                ApiError::InternalServer("revocation cache unavailable".to_string())
            })
        })
        .await?;

        Ok(value.as_deref() == Some(REVOKED_MARKER))
    }
}

fn revocation_key(token: &str) -> String {
    format!("{}{}", REVOCATION_PREFIX, token)
}
