//! Registration domain types.

use chrono::{DateTime, NaiveDate, Utc};

use summit_core::{AttendeeId, Email, RegistrationId};

/// A stored attendee registration.
///
/// Created once on a successful form submission and never updated.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Registration {
    /// Surrogate key.
    pub id: RegistrationId,
    /// Attendee's full name.
    pub full_name: String,
    /// External attendee identifier (employee ID), unique.
    pub emp_id: AttendeeId,
    /// Office or city.
    pub location: String,
    /// Date of birth.
    pub dob: NaiveDate,
    /// Organizational email address, unique.
    pub email: Email,
    /// Business unit the attendee belongs to.
    pub business_unit: String,
    /// Primary contact number.
    pub contact: String,
    /// Emergency contact number.
    pub emergency_contact: String,
    /// Whether the attendee gave consent.
    pub consent: bool,
    /// Free-text medical conditions note.
    pub medical_conditions: String,
    /// File name of the generated QR code image, if one was written.
    pub qr_code: Option<String>,
    /// When the registration was stored.
    pub created_at: DateTime<Utc>,
}

/// A validated registration ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub full_name: String,
    pub emp_id: AttendeeId,
    pub location: String,
    pub dob: NaiveDate,
    pub email: Email,
    pub business_unit: String,
    pub contact: String,
    pub emergency_contact: String,
    pub consent: bool,
    pub medical_conditions: String,
}
