//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Registration form
//! GET  /register                      - Registration form (?success=1 shows banner)
//! POST /register                      - Submit registration
//!
//! # Entrance check-in
//! GET  /verify/{attendee_id}          - QR scan landing page, records check-in
//! POST /issue_id/{verification_id}    - Mark physical ID card issued
//!
//! # Staff listings
//! GET  /registrations                 - All registrations
//! GET  /verifications                 - All check-ins
//! ```

pub mod listings;
pub mod registration;
pub mod verify;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};

use crate::state::AppState;

/// Create all page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(registration::show))
        .route(
            "/register",
            get(registration::show).post(registration::submit),
        )
        .route("/verify/{attendee_id}", get(verify::verify))
        .route("/issue_id/{verification_id}", post(verify::issue_id))
        .route("/registrations", get(listings::registrations))
        .route("/verifications", get(listings::verifications))
}

/// Format a stored timestamp for display.
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
