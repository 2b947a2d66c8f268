//! User management: registration, password changes and OAuth account upkeep

use std::sync::Arc;
use tracing::{info, warn};

use super::models::{ChangePasswordRequest, CreateUserRequest, NewUser, User};
use super::store::CredentialStore;
use super::validators::{ChangePasswordValidator, CreateUserValidator};
use crate::auth::tokens::{normalize_password, TokenService};
use crate::common::{safe_email_log, ApiError, Validator};

pub struct UsersService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
}

impl UsersService {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Register a password-based account. Duplicate username or email is a
    /// `Conflict`, decided by the store's unique constraints.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, ApiError> {
        CreateUserValidator.validate(&request).into_result()?;

        let password = self.tokens.hash_password(&request.password).await?;
        let user = self.store.create(into_new_user(request, password)).await?;

        info!(
            user_id = user.id,
            email = %safe_email_log(&user.email),
            "User registered"
        );
        Ok(user)
    }

    /// Create an account for a first-time OAuth login. The placeholder password
    /// is hashed like any other.
    pub async fn create_oauth_user(&self, request: CreateUserRequest) -> Result<User, ApiError> {
        let password = self.tokens.hash_password(&request.password).await?;
        let user = self.store.create(into_new_user(request, password)).await?;

        info!(
            user_id = user.id,
            email = %safe_email_log(&user.email),
            "User created from OAuth profile"
        );
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<User, ApiError> {
        self.store.find_by_id(id).await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        self.store.find_by_username(username).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        self.store.find_by_email(email).await
    }

    /// Record the latest provider tokens for a user, creating the link on first use.
    pub async fn update_oauth_tokens(
        &self,
        user_id: i64,
        provider: &str,
        provider_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), ApiError> {
        let user = self.store.find_by_id(user_id).await?;
        self.store
            .upsert_oauth_link(user.id, provider, provider_id, access_token, refresh_token)
            .await
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        request: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        if normalize_password(&request.new_password)
            != normalize_password(&request.new_password_confirm)
        {
            return Err(ApiError::Conflict("New passwords do not match".to_string()));
        }
        ChangePasswordValidator.validate(&request).into_result()?;

        let mut user = self.store.find_by_id(user_id).await?;

        let current_ok = self
            .tokens
            .verify_password(&request.current_password, &user.password)
            .await?;
        if !current_ok {
            warn!(user_id = user_id, "Password change rejected: current password mismatch");
            return Err(ApiError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        user.password = self.tokens.hash_password(&request.new_password).await?;
        self.store.save(&user).await?;

        info!(user_id = user_id, "Password changed");
        Ok(())
    }
}

fn into_new_user(request: CreateUserRequest, hashed_password: String) -> NewUser {
    NewUser {
        username: request.username,
        email: request.email,
        password: hashed_password,
        firstname: request.firstname,
        lastname: request.lastname,
        photo: request.photo,
    }
}
