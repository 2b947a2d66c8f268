//! Credential store: persistence for users and their OAuth links

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, error, info};

use super::models::{NewUser, OAuthLink, User, DEFAULT_PHOTO};
use crate::common::{safe_email_log, with_timeout, ApiError};

const USER_COLUMNS: &str = "id, username, password, email, photo, firstname, lastname, \
                            maternalname, created_at, updated_at";

/// Persistence collaborator of the auth core.
///
/// Username and email lookups compare exactly as stored; no case folding or
/// trimming happens here.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, ApiError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;

    /// Fails with `NotFound` when no user has this id
    async fn find_by_id(&self, id: i64) -> Result<User, ApiError>;

    /// Fails with `Conflict` when the username or email is taken
    async fn create(&self, new_user: NewUser) -> Result<User, ApiError>;

    async fn save(&self, user: &User) -> Result<User, ApiError>;

    /// Insert or update the link for (user, provider); token fields are last-writer-wins.
    async fn upsert_oauth_link(
        &self,
        user_id: i64,
        provider: &str,
        provider_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), ApiError>;

    async fn find_oauth_link(
        &self,
        user_id: i64,
        provider: &str,
    ) -> Result<Option<OAuthLink>, ApiError>;

    async fn oauth_links(&self, user_id: i64) -> Result<Vec<OAuthLink>, ApiError>;
}

/// SQLite-backed credential store
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

fn map_db_error(operation: &str, e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            debug!(operation = %operation, "Unique constraint rejected write");
            return ApiError::Conflict("Username or email already exists".to_string());
        }
        if db_err.is_foreign_key_violation() {
            return ApiError::NotFound("User not found".to_string());
        }
    }
    error!(error = %e, operation = %operation, "Database error in credential store");
    ApiError::InternalServer(format!("database error during {}", operation))
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        with_timeout("find user by username", self.timeout, async {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE username = ?",
                USER_COLUMNS
            ))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("find user by username", e))
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        with_timeout("find user by email", self.timeout, async {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE email = ?",
                USER_COLUMNS
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("find user by email", e))
        })
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<User, ApiError> {
        let user = with_timeout("find user by id", self.timeout, async {
            sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_db_error("find user by id", e))
        })
        .await?;

        user.ok_or_else(|| ApiError::NotFound(format!("User with ID {} not found", id)))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, ApiError> {
        let id = with_timeout("create user", self.timeout, async {
            sqlx::query(
                "INSERT INTO users (username, email, password, photo, firstname, lastname) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password)
            .bind(
                new_user
                    .photo
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .unwrap_or(DEFAULT_PHOTO),
            )
            .bind(new_user.firstname.as_deref())
            .bind(new_user.lastname.as_deref())
            .execute(&self.pool)
            .await
            .map(|done| done.last_insert_rowid())
            .map_err(|e| map_db_error("create user", e))
        })
        .await?;

        info!(
            user_id = id,
            email = %safe_email_log(&new_user.email),
            "User record created"
        );

        self.find_by_id(id).await
    }

    async fn save(&self, user: &User) -> Result<User, ApiError> {
        let rows = with_timeout("save user", self.timeout, async {
            sqlx::query(
                "UPDATE users SET username = ?, email = ?, password = ?, photo = ?, \
                 firstname = ?, lastname = ?, maternalname = ?, updated_at = datetime('now') \
                 WHERE id = ?",
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.photo)
            .bind(user.firstname.as_deref())
            .bind(user.lastname.as_deref())
            .bind(user.maternalname.as_deref())
            .bind(user.id)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(|e| map_db_error("save user", e))
        })
        .await?;

        if rows == 0 {
            return Err(ApiError::NotFound(format!(
                "User with ID {} not found",
                user.id
            )));
        }

        self.find_by_id(user.id).await
    }

    async fn upsert_oauth_link(
        &self,
        user_id: i64,
        provider: &str,
        provider_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), ApiError> {
        with_timeout("upsert oauth link", self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO oauth_providers (user_id, provider, provider_id, access_token, refresh_token)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(user_id, provider) DO UPDATE SET
                    provider_id = excluded.provider_id,
                    access_token = excluded.access_token,
                    refresh_token = excluded.refresh_token,
                    updated_at = datetime('now')
                "#,
            )
            .bind(user_id)
            .bind(provider)
            .bind(provider_id)
            .bind(access_token)
            .bind(refresh_token)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error("upsert oauth link", e))
        })
        .await?;

        debug!(user_id = user_id, provider = %provider, "OAuth link upserted");
        Ok(())
    }

    async fn find_oauth_link(
        &self,
        user_id: i64,
        provider: &str,
    ) -> Result<Option<OAuthLink>, ApiError> {
        with_timeout("find oauth link", self.timeout, async {
            sqlx::query_as::<_, OAuthLink>(
                "SELECT id, user_id, provider, provider_id, access_token, refresh_token \
                 FROM oauth_providers WHERE user_id = ? AND provider = ?",
            )
            .bind(user_id)
            .bind(provider)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("find oauth link", e))
        })
        .await
    }

    async fn oauth_links(&self, user_id: i64) -> Result<Vec<OAuthLink>, ApiError> {
        with_timeout("list oauth links", self.timeout, async {
            sqlx::query_as::<_, OAuthLink>(
                "SELECT id, user_id, provider, provider_id, access_token, refresh_token \
                 FROM oauth_providers WHERE user_id = ? ORDER BY id",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("list oauth links", e))
        })
        .await
    }
}
