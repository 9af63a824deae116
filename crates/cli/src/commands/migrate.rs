//! Database migration command.
//!
//! # Environment Variables
//!
//! - `SUMMIT_DATABASE_URL` - `SQLite` connection string
//! - `DATABASE_URL` - fallback when the above is unset
//!
//! Defaults to `sqlite://registrations.db` when neither is set. The server
//! applies the same embedded migrations on startup.

use secrecy::SecretString;
use thiserror::Error;

use summit_server::db;

/// Database used when no URL is configured.
const DEFAULT_DATABASE_URL: &str = "sqlite://registrations.db";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database cannot be opened or a migration
/// fails.
pub async fn run(database_url: Option<String>) -> Result<(), MigrationError> {
    let _ = dotenvy::dotenv();

    let url = resolve_database_url(database_url, |key| std::env::var(key).ok());
    let url = SecretString::from(url);

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&url).await?;

    tracing::info!("Running migrations...");
    db::run_migrations(&pool).await?;

    pool.close().await;
    tracing::info!("Migrations complete!");
    Ok(())
}

/// Pick the database URL: explicit flag, then environment, then default.
fn resolve_database_url(flag: Option<String>, env: impl Fn(&str) -> Option<String>) -> String {
    flag.or_else(|| env("SUMMIT_DATABASE_URL"))
        .or_else(|| env("DATABASE_URL"))
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}
