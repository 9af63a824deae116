//! Verification repository for entrance check-ins.

use chrono::Utc;
use sqlx::SqlitePool;

use summit_core::{AttendeeId, VerificationId};

use super::RepositoryError;
use crate::models::{Registration, Verification};

const VERIFICATION_COLUMNS: &str = "id, emp_id, full_name, verified_at, id_card_issued";

/// Repository for verification database operations.
pub struct VerificationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> VerificationRepository<'a> {
    /// Create a new verification repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a check-in for a registered attendee, keeping the first one.
    ///
    /// The insert is a single `ON CONFLICT DO NOTHING` statement, so
    /// concurrent scans of the same code still leave exactly one row.
    ///
    /// # Returns
    ///
    /// The stored verification and `true` if this call created it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if the row vanished after insert.
    pub async fn record_first_scan(
        &self,
        registration: &Registration,
    ) -> Result<(Verification, bool), RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO verifications (emp_id, full_name, verified_at, id_card_issued)
            VALUES (?, ?, ?, 0)
            ON CONFLICT (emp_id) DO NOTHING
            ",
        )
        .bind(&registration.emp_id)
        .bind(&registration.full_name)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        let created = result.rows_affected() == 1;

        let verification = self
            .get_by_attendee_id(&registration.emp_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "verification for {} missing after insert",
                    registration.emp_id
                ))
            })?;

        Ok((verification, created))
    }

    /// Get the verification for an attendee, if they have checked in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_attendee_id(
        &self,
        emp_id: &AttendeeId,
    ) -> Result<Option<Verification>, RepositoryError> {
        let row = sqlx::query_as::<_, Verification>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM verifications WHERE emp_id = ?"
        ))
        .bind(emp_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Get a verification by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: VerificationId,
    ) -> Result<Option<Verification>, RepositoryError> {
        let row = sqlx::query_as::<_, Verification>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM verifications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Mark that a physical ID card has been handed out.
    ///
    /// Setting an already-set flag succeeds. There is no way to clear it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the verification doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn mark_card_issued(&self, id: VerificationId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE verifications
            SET id_card_issued = 1
            WHERE id = ?
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// List every verification in check-in order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Verification>, RepositoryError> {
        let rows = sqlx::query_as::<_, Verification>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM verifications ORDER BY id ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use summit_core::Email;

    use super::*;
    use crate::db::RegistrationRepository;
    use crate::db::test_support::memory_pool;
    use crate::models::NewRegistration;

    async fn registered(pool: &SqlitePool, emp_id: &str) -> Registration {
        let new = NewRegistration {
            full_name: format!("Attendee {emp_id}"),
            emp_id: AttendeeId::parse(emp_id).unwrap(),
            location: "Pune".to_string(),
            dob: NaiveDate::from_ymd_opt(1988, 1, 30).unwrap(),
            email: Email::parse(&format!("{emp_id}@qaoncloud.com")).unwrap(),
            business_unit: "Cloud".to_string(),
            contact: "111".to_string(),
            emergency_contact: "222".to_string(),
            consent: false,
            medical_conditions: "None".to_string(),
        };
        RegistrationRepository::new(pool)
            .create(&new, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_scan_wins() {
        let pool = memory_pool().await;
        let registration = registered(&pool, "E100").await;
        let repo = VerificationRepository::new(&pool);

        let (first, created) = repo.record_first_scan(&registration).await.unwrap();
        assert!(created);
        assert_eq!(first.full_name, "Attendee E100");
        assert!(!first.id_card_issued);

        let (second, created_again) = repo.record_first_scan(&registration).await.unwrap();
        assert!(!created_again);
        assert_eq!(second, first);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_card_issued_is_idempotent() {
        let pool = memory_pool().await;
        let registration = registered(&pool, "E200").await;
        let repo = VerificationRepository::new(&pool);
        let (verification, _) = repo.record_first_scan(&registration).await.unwrap();

        repo.mark_card_issued(verification.id).await.unwrap();
        repo.mark_card_issued(verification.id).await.unwrap();

        let stored = repo.get_by_id(verification.id).await.unwrap().unwrap();
        assert!(stored.id_card_issued);
    }

    #[tokio::test]
    async fn test_mark_card_issued_unknown_id() {
        let pool = memory_pool().await;
        let repo = VerificationRepository::new(&pool);

        let err = repo
            .mark_card_issued(VerificationId::new(999))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
