//! Attendee registration workflow.
//!
//! Validation is fail-fast and ordered: required fields, date of birth,
//! email domain, contact numbers, then the two uniqueness checks. Only a
//! submission that passes every step produces a QR code, a row and an email.
//!
//! The uniqueness pre-checks give friendly messages for the common case. The
//! store's unique constraints remain authoritative, and a constraint
//! violation at insert time is reported exactly like a failed pre-check.

use std::borrow::Cow;

use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use summit_core::{AttendeeId, AttendeeIdError, DomainAllowList, Email, EmailError};

use crate::db::{ConflictField, RegistrationRepository, RepositoryError};
use crate::models::{NewRegistration, Registration};
use crate::services::notifier::Confirmation;
use crate::services::qr::{self, QrError};
use crate::state::AppState;

/// Longest accepted full name.
pub const FULL_NAME_MAX_LENGTH: usize = 100;

/// Message shown above an empty form after a successful submission.
pub const SUCCESS_MESSAGE: &str = "Registration submitted successfully!";

/// Message shown for any failure the user cannot fix.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Raw registration form as submitted by the browser.
///
/// Every field defaults to empty so a missing input is reported by
/// validation rather than rejected by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub full_name: String,
    pub emp_id: String,
    pub location: String,
    pub dob: String,
    pub email: String,
    pub business_unit: String,
    pub emergency_contact: String,
    pub contact: String,
    pub consent: Option<String>,
    pub medical_conditions: String,
}

/// Why a registration was not stored.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("invalid employee ID: {0}")]
    InvalidAttendeeId(AttendeeIdError),

    #[error("invalid email: {0}")]
    InvalidEmail(EmailError),

    #[error("invalid date of birth: {0}")]
    InvalidDateOfBirth(String),

    #[error("email domain not allowed: {0}")]
    EmailDomainNotAllowed(String),

    #[error("contact number equals emergency contact number")]
    ContactMatchesEmergency,

    #[error("attendee ID already exists")]
    AttendeeIdExists,

    #[error("email already registered")]
    EmailExists,

    #[error("store error: {0}")]
    Store(RepositoryError),

    #[error("QR code generation failed: {0}")]
    CodeGeneration(#[from] QrError),
}

impl RegistrationError {
    /// Text shown to the person filling in the form.
    ///
    /// Infrastructure failures collapse to a generic message.
    #[must_use]
    pub fn user_message(&self) -> Cow<'static, str> {
        match self {
            Self::MissingField(field) => Cow::Owned(format!("{field} is required.")),
            Self::FieldTooLong { field, max } => {
                Cow::Owned(format!("{field} must be at most {max} characters."))
            }
            Self::InvalidAttendeeId(_) => Cow::Borrowed("Please enter a valid employee ID."),
            Self::InvalidEmail(_) => Cow::Borrowed("Please enter a valid email address."),
            Self::InvalidDateOfBirth(_) => Cow::Borrowed("Invalid date of birth."),
            Self::EmailDomainNotAllowed(_) => {
                Cow::Borrowed("Registration is restricted to organization email addresses.")
            }
            Self::ContactMatchesEmergency => Cow::Borrowed(
                "Contact number and emergency contact number must be different.",
            ),
            Self::AttendeeIdExists => Cow::Borrowed("Employee ID already exists."),
            Self::EmailExists => Cow::Borrowed("Email already registered."),
            Self::Store(_) | Self::CodeGeneration(_) => Cow::Borrowed(GENERIC_FAILURE_MESSAGE),
        }
    }

    /// HTTP status the form is re-rendered with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::AttendeeIdExists | Self::EmailExists => StatusCode::CONFLICT,
            Self::Store(_) | Self::CodeGeneration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Whether this failure is an infrastructure fault rather than bad input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::CodeGeneration(_))
    }
}

impl From<RepositoryError> for RegistrationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(ConflictField::AttendeeId) => Self::AttendeeIdExists,
            RepositoryError::Conflict(ConflictField::Email) => Self::EmailExists,
            other => Self::Store(other),
        }
    }
}

/// Check a submission without touching the store.
///
/// Runs the required-field checks followed by date of birth, email domain
/// and contact number rules, in that order.
///
/// # Errors
///
/// Returns the first rule the form breaks.
pub fn validate(
    form: &RegistrationForm,
    allowed_domains: &DomainAllowList,
) -> Result<NewRegistration, RegistrationError> {
    let full_name = form.full_name.trim();
    if full_name.is_empty() {
        return Err(RegistrationError::MissingField("Full name"));
    }
    if full_name.chars().count() > FULL_NAME_MAX_LENGTH {
        return Err(RegistrationError::FieldTooLong {
            field: "Full name",
            max: FULL_NAME_MAX_LENGTH,
        });
    }

    let emp_id = AttendeeId::parse(&form.emp_id).map_err(|e| match e {
        AttendeeIdError::Empty => RegistrationError::MissingField("Employee ID"),
        AttendeeIdError::TooLong { max } => RegistrationError::FieldTooLong {
            field: "Employee ID",
            max,
        },
        other => RegistrationError::InvalidAttendeeId(other),
    })?;

    let email = Email::parse(&form.email).map_err(|e| match e {
        EmailError::Empty => RegistrationError::MissingField("Email"),
        other => RegistrationError::InvalidEmail(other),
    })?;

    let dob_raw = form.dob.trim();
    let dob = NaiveDate::parse_from_str(dob_raw, "%Y-%m-%d")
        .map_err(|_| RegistrationError::InvalidDateOfBirth(dob_raw.to_string()))?;

    if !allowed_domains.permits(&email) {
        return Err(RegistrationError::EmailDomainNotAllowed(
            email.domain().to_string(),
        ));
    }

    let contact = form.contact.trim();
    let emergency_contact = form.emergency_contact.trim();
    if contact == emergency_contact {
        return Err(RegistrationError::ContactMatchesEmergency);
    }

    Ok(NewRegistration {
        full_name: full_name.to_string(),
        emp_id,
        location: form.location.trim().to_string(),
        dob,
        email,
        business_unit: form.business_unit.trim().to_string(),
        contact: contact.to_string(),
        emergency_contact: emergency_contact.to_string(),
        consent: form
            .consent
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("yes")),
        medical_conditions: form.medical_conditions.trim().to_string(),
    })
}

/// Validate, store and confirm a registration.
///
/// On success a QR code has been written, the row inserted and a
/// confirmation handed to the notifier. Email delivery failures are logged
/// and do not fail the registration.
///
/// # Errors
///
/// Returns `RegistrationError` for rejected input, duplicates and
/// infrastructure failures. Nothing is persisted in any error case.
#[tracing::instrument(skip_all, fields(emp_id = %form.emp_id.trim()))]
pub async fn register(
    state: &AppState,
    form: &RegistrationForm,
) -> Result<Registration, RegistrationError> {
    let config = state.config();
    let new = validate(form, &config.allowed_email_domains)?;

    let repo = RegistrationRepository::new(state.pool());
    if repo.attendee_id_exists(&new.emp_id).await? {
        return Err(RegistrationError::AttendeeIdExists);
    }
    if repo.email_exists(&new.email).await? {
        return Err(RegistrationError::EmailExists);
    }

    let verify_url = qr::verification_url(&config.public_base_url, &new.emp_id)?;
    let code = state.qr().generate(verify_url.as_str()).await?;

    let registration = match repo.create(&new, Some(&code.file_name)).await {
        Ok(registration) => registration,
        Err(e) => {
            state.qr().discard(&code).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        registration_id = %registration.id,
        qr_code = %code.file_name,
        "Registration stored"
    );

    let confirmation = Confirmation {
        to: registration.email.clone(),
        name: registration.full_name.clone(),
        attendee_id: registration.emp_id.clone(),
        verify_url: verify_url.into(),
        qr_code: Some(code.path),
    };
    if let Err(e) = state.notifier().send_confirmation(&confirmation).await {
        tracing::warn!(
            to = %confirmation.to,
            error = %e,
            "Failed to send confirmation email"
        );
    }

    Ok(registration)
}
