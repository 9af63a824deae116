//! Staff listings of registrations and check-ins.

use std::path::Path;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use super::format_timestamp;
use crate::config::SummitConfig;
use crate::db::{RegistrationRepository, VerificationRepository};
use crate::error::Result;
use crate::filters;
use crate::models::{Registration, Verification};
use crate::state::AppState;

/// One row of the registrations table.
pub struct RegistrationRow {
    pub id: i64,
    pub full_name: String,
    pub emp_id: String,
    pub location: String,
    pub dob: String,
    pub email: String,
    pub business_unit: String,
    pub contact: String,
    pub emergency_contact: String,
    pub consent: bool,
    pub medical_conditions: String,
    pub qr_code_url: Option<String>,
    pub created_at: String,
}

impl RegistrationRow {
    fn new(registration: Registration, config: &SummitConfig) -> Self {
        let qr_code_url = registration
            .qr_code
            .as_deref()
            .and_then(|file| qr_code_url(&config.static_dir, &config.qr_dir, file));

        Self {
            id: registration.id.as_i64(),
            full_name: registration.full_name,
            emp_id: registration.emp_id.into_inner(),
            location: registration.location,
            dob: registration.dob.format("%Y-%m-%d").to_string(),
            email: registration.email.into_inner(),
            business_unit: registration.business_unit,
            contact: registration.contact,
            emergency_contact: registration.emergency_contact,
            consent: registration.consent,
            medical_conditions: registration.medical_conditions,
            qr_code_url,
            created_at: format_timestamp(&registration.created_at),
        }
    }
}

/// One row of the verifications table.
pub struct VerificationRow {
    pub id: i64,
    pub emp_id: String,
    pub full_name: String,
    pub verified_at: String,
    pub id_card_issued: bool,
}

impl From<Verification> for VerificationRow {
    fn from(verification: Verification) -> Self {
        Self {
            id: verification.id.as_i64(),
            emp_id: verification.emp_id.into_inner(),
            full_name: verification.full_name,
            verified_at: format_timestamp(&verification.verified_at),
            id_card_issued: verification.id_card_issued,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "registrations.html")]
pub struct RegistrationsTemplate {
    pub rows: Vec<RegistrationRow>,
}

#[derive(Template, WebTemplate)]
#[template(path = "verifications.html")]
pub struct VerificationsTemplate {
    pub rows: Vec<VerificationRow>,
}

/// List every registration.
///
/// GET /registrations
#[instrument(skip(state))]
pub async fn registrations(State(state): State<AppState>) -> Result<RegistrationsTemplate> {
    let rows = RegistrationRepository::new(state.pool())
        .list_all()
        .await?
        .into_iter()
        .map(|r| RegistrationRow::new(r, state.config()))
        .collect();

    Ok(RegistrationsTemplate { rows })
}

/// List every check-in.
///
/// GET /verifications
#[instrument(skip(state))]
pub async fn verifications(State(state): State<AppState>) -> Result<VerificationsTemplate> {
    let rows = VerificationRepository::new(state.pool())
        .list_all()
        .await?
        .into_iter()
        .map(VerificationRow::from)
        .collect();

    Ok(VerificationsTemplate { rows })
}

/// Public URL of a QR image, if the QR directory is served under `/static`.
fn qr_code_url(static_dir: &Path, qr_dir: &Path, file_name: &str) -> Option<String> {
    let relative = qr_dir.strip_prefix(static_dir).ok()?;
    let mut url = String::from("/static");
    for part in relative {
        url.push('/');
        url.push_str(part.to_str()?);
    }
    url.push('/');
    url.push_str(file_name);
    Some(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_code_url_under_static() {
        assert_eq!(
            qr_code_url(
                Path::new("crates/server/static"),
                Path::new("crates/server/static/qrcodes"),
                "abc.png"
            )
            .as_deref(),
            Some("/static/qrcodes/abc.png")
        );
    }

    #[test]
    fn test_qr_code_url_outside_static() {
        assert!(qr_code_url(Path::new("/srv/static"), Path::new("/var/qr"), "abc.png").is_none());
    }

    #[test]
    fn test_empty_listing_renders() {
        let html = VerificationsTemplate { rows: Vec::new() }.render().unwrap();
        assert!(html.contains("No attendees have checked in yet."));
        let html = RegistrationsTemplate { rows: Vec::new() }.render().unwrap();
        assert!(html.contains("No registrations yet."));
    }

    #[test]
    fn test_verification_row_renders_issue_button() {
        let html = VerificationsTemplate {
            rows: vec![
                VerificationRow {
                    id: 3,
                    emp_id: "E100".to_string(),
                    full_name: "Asha Rao".to_string(),
                    verified_at: "2026-03-01 09:15:00 UTC".to_string(),
                    id_card_issued: false,
                },
                VerificationRow {
                    id: 4,
                    emp_id: "E200".to_string(),
                    full_name: "Ravi Kumar".to_string(),
                    verified_at: "2026-03-01 09:20:00 UTC".to_string(),
                    id_card_issued: true,
                },
            ],
        }
        .render()
        .unwrap();
        assert!(html.contains("action=\"/issue_id/3\""));
        assert!(!html.contains("action=\"/issue_id/4\""));
        assert!(html.contains("Issued"));
    }
}
