//! Authentication data models

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::users::models::{User, UserDto};

/// JWT claims structure, shared by access and refresh tokens
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Local user id
    pub sub: String,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
    /// Unique per issued token
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Who a token is issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: i64,
    pub username: String,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful login / OAuth login response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// OAuth login payload as delivered by the provider callback or the client
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OAuthLoginRequest {
    pub provider: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub profile: Option<Value>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RefreshTokenRequest {
    pub token: String,
}
