//! Database operations for the registration record store.
//!
//! # Database: `SQLite`
//!
//! ## Tables
//!
//! - `registrations` - One row per attendee; `emp_id` and `email` are unique
//! - `verifications` - Entrance check-ins; at most one per `emp_id`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/`, embedded into the
//! binary, and applied on server start-up or explicitly via:
//! ```bash
//! cargo run -p summit-cli -- migrate
//! ```

pub mod registrations;
pub mod verifications;

use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

pub use registrations::RegistrationRepository;
pub use verifications::VerificationRepository;

/// Which unique column a write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    /// `registrations.emp_id` / `verifications.emp_id`
    AttendeeId,
    /// `registrations.email`
    Email,
    /// A unique constraint this module does not name.
    Other,
}

impl std::fmt::Display for ConflictField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AttendeeId => f.write_str("attendee id"),
            Self::Email => f.write_str("email"),
            Self::Other => f.write_str("unique key"),
        }
    }
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("constraint violation: {0} already exists")]
    Conflict(ConflictField),
}

impl RepositoryError {
    /// Translate a unique-constraint violation into [`RepositoryError::Conflict`].
    ///
    /// `SQLite` reports violations as `UNIQUE constraint failed: table.column`
    /// and does not expose the constraint name, so the column is read from the
    /// message.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            let message = db_err.message();
            let field = if message.contains(".emp_id") {
                ConflictField::AttendeeId
            } else if message.contains(".email") {
                ConflictField::Email
            } else {
                ConflictField::Other
            };
            return Self::Conflict(field);
        }
        Self::Database(err)
    }
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// The database file is created if missing. In-memory databases
/// (`sqlite::memory:`) are pinned to a single long-lived connection so every
/// query sees the same data.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(database_url: &SecretString) -> Result<SqlitePool, sqlx::Error> {
    let url = database_url.expose_secret();
    let in_memory = url.contains(":memory:");

    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let options = if in_memory {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    pool_options
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Apply all embedded migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the applied history does
/// not match the embedded set.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
