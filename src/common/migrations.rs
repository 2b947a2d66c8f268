// src/common/migrations.rs
//! Database schema bootstrap

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Create the auth tables if they don't exist yet.
///
/// `RESET_DB=true` drops them first.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("⚠️  RESET_DB=true - Dropping auth tables and recreating schema...");
        drop_all_tables(pool).await?;
    }

    create_schema(pool).await?;

    info!("✅ Database schema ready");
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // oauth_providers references users
    sqlx::query("DROP TABLE IF EXISTS oauth_providers")
        .execute(pool)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS users").execute(pool).await?;
    Ok(())
}

/// Unique constraints on `username`/`email` and on `(user_id, provider)` carry
/// the no-duplicate invariants; text comparison uses SQLite's default BINARY
/// collation, so lookups are case-sensitive.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            photo TEXT NOT NULL DEFAULT 'assets/images/perfil/default_profile_400x400.png',
            firstname TEXT,
            lastname TEXT,
            maternalname TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS oauth_providers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            provider TEXT NOT NULL,
            provider_id TEXT NOT NULL,
            access_token TEXT NOT NULL,
            refresh_token TEXT,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (user_id, provider)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_oauth_providers_user ON oauth_providers(user_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
