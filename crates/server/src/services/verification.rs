//! Entrance check-in and ID card issuance.

use sqlx::SqlitePool;

use summit_core::{AttendeeId, VerificationId};

use crate::db::{RegistrationRepository, RepositoryError, VerificationRepository};
use crate::models::{Registration, Verification};

/// Result of scanning an attendee's QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No registration carries this identifier.
    Invalid,
    /// The attendee is registered and checked in.
    Verified {
        registration: Registration,
        verification: Verification,
        /// `true` only for the scan that created the check-in record.
        first_scan: bool,
    },
}

/// Look up a scanned identifier and record the check-in.
///
/// The first scan wins: later scans return the original record unchanged.
///
/// # Errors
///
/// Returns `RepositoryError` if the store cannot be queried.
#[tracing::instrument(skip(pool), fields(emp_id = %emp_id))]
pub async fn verify(pool: &SqlitePool, emp_id: &AttendeeId) -> Result<ScanOutcome, RepositoryError> {
    let Some(registration) = RegistrationRepository::new(pool)
        .get_by_attendee_id(emp_id)
        .await?
    else {
        tracing::info!("Scan of unknown attendee ID");
        return Ok(ScanOutcome::Invalid);
    };

    let (verification, first_scan) = VerificationRepository::new(pool)
        .record_first_scan(&registration)
        .await?;

    if first_scan {
        tracing::info!(verification_id = %verification.id, "Attendee checked in");
    } else {
        tracing::debug!(verification_id = %verification.id, "Repeat scan");
    }

    Ok(ScanOutcome::Verified {
        registration,
        verification,
        first_scan,
    })
}

/// Mark the physical ID card as handed out.
///
/// Issuing twice is a no-op success.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no such verification exists.
#[tracing::instrument(skip(pool))]
pub async fn issue_card(pool: &SqlitePool, id: VerificationId) -> Result<(), RepositoryError> {
    VerificationRepository::new(pool).mark_card_issued(id).await?;
    tracing::info!("ID card issued");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use summit_core::Email;

    use super::*;
    use crate::db::test_support::memory_pool;
    use crate::models::NewRegistration;

    async fn seed(pool: &SqlitePool, emp_id: &str) -> Registration {
        RegistrationRepository::new(pool)
            .create(
                &NewRegistration {
                    full_name: "Asha Rao".to_string(),
                    emp_id: AttendeeId::parse(emp_id).unwrap(),
                    location: "Chennai".to_string(),
                    dob: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
                    email: Email::parse(&format!("{emp_id}@qaoncloud.com")).unwrap(),
                    business_unit: "QA".to_string(),
                    contact: "111".to_string(),
                    emergency_contact: "222".to_string(),
                    consent: true,
                    medical_conditions: String::new(),
                },
                None,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_attendee_is_invalid() {
        let pool = memory_pool().await;
        let outcome = verify(&pool, &AttendeeId::parse("E404").unwrap())
            .await
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Invalid);
        assert!(VerificationRepository::new(&pool).list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_scan_wins() {
        let pool = memory_pool().await;
        let registration = seed(&pool, "E100").await;

        let ScanOutcome::Verified {
            verification: first,
            first_scan: true,
            ..
        } = verify(&pool, &registration.emp_id).await.unwrap()
        else {
            panic!("expected first scan");
        };

        let ScanOutcome::Verified {
            verification: second,
            first_scan: false,
            registration: again,
        } = verify(&pool, &registration.emp_id).await.unwrap()
        else {
            panic!("expected repeat scan");
        };

        assert_eq!(first, second);
        assert_eq!(again, registration);
        assert_eq!(VerificationRepository::new(&pool).list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_issue_card() {
        let pool = memory_pool().await;
        let registration = seed(&pool, "E100").await;
        let ScanOutcome::Verified { verification, .. } =
            verify(&pool, &registration.emp_id).await.unwrap()
        else {
            panic!("expected verified");
        };
        assert!(!verification.id_card_issued);

        issue_card(&pool, verification.id).await.unwrap();
        issue_card(&pool, verification.id).await.unwrap();

        let stored = VerificationRepository::new(&pool)
            .get_by_id(verification.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.id_card_issued);
    }

    #[tokio::test]
    async fn test_issue_card_unknown() {
        let pool = memory_pool().await;
        let err = issue_card(&pool, VerificationId::new(99)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
