//! Registration repository for database operations.
//!
//! Queries are checked at runtime and mapped with `sqlx::FromRow`.

use chrono::Utc;
use sqlx::SqlitePool;

use summit_core::{AttendeeId, Email};

use super::RepositoryError;
use crate::models::{NewRegistration, Registration};

const REGISTRATION_COLUMNS: &str = "id, full_name, emp_id, location, dob, email, business_unit, \
     contact, emergency_contact, consent, medical_conditions, qr_code, created_at";

/// Repository for registration database operations.
pub struct RegistrationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RegistrationRepository<'a> {
    /// Create a new registration repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Check whether an attendee ID is already registered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn attendee_id_exists(&self, emp_id: &AttendeeId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM registrations WHERE emp_id = ?)")
                .bind(emp_id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Check whether an email address is already registered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM registrations WHERE email = ?)")
                .bind(email)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Get a registration by attendee ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_attendee_id(
        &self,
        emp_id: &AttendeeId,
    ) -> Result<Option<Registration>, RepositoryError> {
        let row = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE emp_id = ?"
        ))
        .bind(emp_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Insert a new registration.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming the column if the attendee
    /// ID or email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        new: &NewRegistration,
        qr_code: Option<&str>,
    ) -> Result<Registration, RepositoryError> {
        let row = sqlx::query_as::<_, Registration>(&format!(
            r"
            INSERT INTO registrations (
                full_name, emp_id, location, dob, email, business_unit,
                contact, emergency_contact, consent, medical_conditions,
                qr_code, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {REGISTRATION_COLUMNS}
            "
        ))
        .bind(&new.full_name)
        .bind(&new.emp_id)
        .bind(&new.location)
        .bind(new.dob)
        .bind(&new.email)
        .bind(&new.business_unit)
        .bind(&new.contact)
        .bind(&new.emergency_contact)
        .bind(new.consent)
        .bind(&new.medical_conditions)
        .bind(qr_code)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(row)
    }

    /// List every registration in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Registration>, RepositoryError> {
        let rows = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations ORDER BY id ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
