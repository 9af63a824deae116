//! Domain models for the registration server.
//!
//! These types represent validated domain objects and the rows they map to.

pub mod registration;
pub mod verification;

pub use registration::{NewRegistration, Registration};
pub use verification::Verification;
