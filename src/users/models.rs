//! User data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_PHOTO: &str = "assets/images/perfil/default_profile_400x400.png";

/// User database model. `password` only ever holds a bcrypt hash.
#[derive(FromRow, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub email: String,
    pub photo: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub maternalname: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Per-provider OAuth link, one row per (user, provider)
#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
pub struct OAuthLink {
    pub id: i64,
    pub user_id: i64,
    pub provider: String,
    pub provider_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Fields for a new user row. `password` must already be hashed when it
/// reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub photo: Option<String>,
}

/// Public projection returned alongside session tokens
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub photo: String,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            photo: user.photo.clone(),
        }
    }
}

/// Full profile returned by registration and lookup endpoints (no hash)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub photo: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub maternalname: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            photo: user.photo,
            firstname: user.firstname,
            lastname: user.lastname,
            maternalname: user.maternalname,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub photo: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}
