//! QR scan landing page and ID card issuance.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use summit_core::{AttendeeId, VerificationId};

use super::format_timestamp;
use crate::error::Result;
use crate::filters;
use crate::services::verification::{self, ScanOutcome};
use crate::state::AppState;

/// Check-in confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "verify.html")]
pub struct VerifyTemplate {
    pub full_name: String,
    pub emp_id: String,
    pub business_unit: String,
    pub verification_id: VerificationId,
    pub verified_at: String,
    pub first_scan: bool,
    pub id_card_issued: bool,
}

/// Shown when a scanned code matches no registration.
#[derive(Template, WebTemplate)]
#[template(path = "verify_invalid.html")]
pub struct InvalidCodeTemplate;

/// Verify a scanned attendee ID.
///
/// GET /verify/{attendee_id}
#[instrument(skip(state))]
pub async fn verify(
    State(state): State<AppState>,
    Path(attendee_id): Path<String>,
) -> Result<Response> {
    let Ok(emp_id) = AttendeeId::parse(&attendee_id) else {
        return Ok((StatusCode::NOT_FOUND, InvalidCodeTemplate).into_response());
    };

    match verification::verify(state.pool(), &emp_id).await? {
        ScanOutcome::Invalid => Ok((StatusCode::NOT_FOUND, InvalidCodeTemplate).into_response()),
        ScanOutcome::Verified {
            registration,
            verification,
            first_scan,
        } => Ok(VerifyTemplate {
            full_name: registration.full_name,
            emp_id: registration.emp_id.into_inner(),
            business_unit: registration.business_unit,
            verification_id: verification.id,
            verified_at: format_timestamp(&verification.verified_at),
            first_scan,
            id_card_issued: verification.id_card_issued,
        }
        .into_response()),
    }
}

/// Record that the attendee received their physical ID card.
///
/// POST /issue_id/{verification_id}
#[instrument(skip(state))]
pub async fn issue_id(
    State(state): State<AppState>,
    Path(verification_id): Path<i64>,
) -> Result<Redirect> {
    verification::issue_card(state.pool(), VerificationId::new(verification_id)).await?;
    Ok(Redirect::to("/verifications"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page(first_scan: bool, id_card_issued: bool) -> VerifyTemplate {
        VerifyTemplate {
            full_name: "Asha Rao".to_string(),
            emp_id: "E100".to_string(),
            business_unit: "QA".to_string(),
            verification_id: VerificationId::new(7),
            verified_at: "2026-03-01 09:15:00 UTC".to_string(),
            first_scan,
            id_card_issued,
        }
    }

    #[test]
    fn test_first_scan_page() {
        let html = page(true, false).render().unwrap();
        assert!(html.contains("Asha Rao"));
        assert!(html.contains("E100"));
        assert!(html.contains("Verified"));
        assert!(html.contains("action=\"/issue_id/7\""));
    }

    #[test]
    fn test_repeat_scan_page() {
        let html = page(false, true).render().unwrap();
        assert!(html.contains("Already verified"));
        assert!(html.contains("2026-03-01 09:15:00 UTC"));
        assert!(!html.contains("action=\"/issue_id/7\""));
    }

    #[test]
    fn test_invalid_page() {
        assert!(InvalidCodeTemplate.render().unwrap().contains("Invalid QR code"));
    }
}
