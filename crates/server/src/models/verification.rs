//! Verification (entrance check-in) domain types.

use chrono::{DateTime, Utc};

use summit_core::{AttendeeId, VerificationId};

/// A recorded entrance check-in.
///
/// At most one exists per attendee. The card flag is the only field that
/// changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Verification {
    /// Surrogate key.
    pub id: VerificationId,
    /// Attendee identifier this check-in belongs to.
    pub emp_id: AttendeeId,
    /// Denormalized copy of the attendee's name at check-in time.
    pub full_name: String,
    /// When the attendee was first verified.
    pub verified_at: DateTime<Utc>,
    /// Whether a physical ID card has been handed out.
    pub id_card_issued: bool,
}
