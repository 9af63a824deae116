//! Business logic services.
//!
//! # Services
//!
//! - `registration` - Form validation, storage and confirmation
//! - `verification` - Entrance check-in and ID card issuance
//! - `qr` - Verification QR code images
//! - `notifier` - Confirmation email delivery

pub mod notifier;
pub mod qr;
pub mod registration;
pub mod verification;

pub use notifier::{Confirmation, Notifier, NotifyError};
pub use qr::{QrCodeGenerator, QrError};
pub use registration::{RegistrationError, RegistrationForm};
pub use verification::ScanOutcome;
