//! Core types for Summit registration.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod attendee;
pub mod email;
pub mod id;

pub use attendee::{AttendeeId, AttendeeIdError};
pub use email::{DomainAllowList, Email, EmailError};
pub use id::*;
