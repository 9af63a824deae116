//! Confirmation email delivery.
//!
//! The [`Notifier`] trait is the seam between the registration workflow and
//! the outside world. Delivery is best-effort: callers log a failure and
//! carry on, and nothing is retried or queued.
//!
//! # Backends
//!
//! - [`SendGridNotifier`] - `SendGrid` v3 HTTP API (production)
//! - [`SmtpNotifier`] - direct SMTP submission via lettre
//! - [`LogNotifier`] - writes the message to the log (development)

mod log;
mod sendgrid;
mod smtp;

use std::path::PathBuf;
use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use thiserror::Error;

use summit_core::{AttendeeId, Email};

use crate::config::{MailConfig, MailTransport};

pub use self::log::LogNotifier;
pub use sendgrid::SendGridNotifier;
pub use smtp::SmtpNotifier;

/// Subject line of the confirmation email.
pub const CONFIRMATION_SUBJECT: &str = "Registration Successful";

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request to the email API failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The email API rejected the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address or header value.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// The QR code attachment could not be read.
    #[error("Attachment error: {0}")]
    Attachment(#[from] std::io::Error),

    /// Required configuration is absent.
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),
}

/// What the attendee is told after registering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Recipient address.
    pub to: Email,
    /// Recipient display name.
    pub name: String,
    /// The attendee's identifier.
    pub attendee_id: AttendeeId,
    /// Link encoded in the QR code.
    pub verify_url: String,
    /// QR code image to attach.
    pub qr_code: Option<PathBuf>,
}

/// Sends confirmation emails.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one confirmation.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the message could not be rendered or handed
    /// to the delivery service.
    async fn send_confirmation(&self, confirmation: &Confirmation) -> Result<(), NotifyError>;
}

/// HTML template for the confirmation email.
#[derive(Template)]
#[template(path = "email/confirmation.html")]
struct ConfirmationEmailHtml<'a> {
    name: &'a str,
    attendee_id: &'a str,
    verify_url: &'a str,
    has_qr_code: bool,
}

/// Plain text template for the confirmation email.
#[derive(Template)]
#[template(path = "email/confirmation.txt")]
struct ConfirmationEmailText<'a> {
    name: &'a str,
    attendee_id: &'a str,
    verify_url: &'a str,
    has_qr_code: bool,
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// A fully rendered confirmation, independent of the delivery backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachment: Option<Attachment>,
}

impl RenderedMessage {
    /// Render the templates and load the QR code from disk.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Template` if rendering fails and
    /// `NotifyError::Attachment` if the image cannot be read.
    pub async fn compose(confirmation: &Confirmation) -> Result<Self, NotifyError> {
        let has_qr_code = confirmation.qr_code.is_some();
        let html = ConfirmationEmailHtml {
            name: &confirmation.name,
            attendee_id: confirmation.attendee_id.as_str(),
            verify_url: &confirmation.verify_url,
            has_qr_code,
        }
        .render()?;
        let text = ConfirmationEmailText {
            name: &confirmation.name,
            attendee_id: confirmation.attendee_id.as_str(),
            verify_url: &confirmation.verify_url,
            has_qr_code,
        }
        .render()?;

        let attachment = match &confirmation.qr_code {
            Some(path) => Some(Attachment {
                file_name: format!("summit-pass-{}.png", confirmation.attendee_id),
                content_type: "image/png",
                bytes: tokio::fs::read(path).await?,
            }),
            None => None,
        };

        Ok(Self {
            subject: CONFIRMATION_SUBJECT.to_string(),
            text,
            html,
            attachment,
        })
    }
}

/// Build the notifier selected by configuration.
///
/// # Errors
///
/// Returns `NotifyError` if the selected backend cannot be constructed.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    let notifier: Arc<dyn Notifier> = match &config.transport {
        MailTransport::SendGrid(sendgrid) => {
            let from = config
                .from_address
                .clone()
                .ok_or(NotifyError::NotConfigured("MAIL_FROM_ADDRESS"))?;
            Arc::new(SendGridNotifier::new(sendgrid, from, &config.from_name)?)
        }
        MailTransport::Smtp(smtp) => {
            let from = config
                .from_address
                .clone()
                .ok_or(NotifyError::NotConfigured("MAIL_FROM_ADDRESS"))?;
            Arc::new(SmtpNotifier::new(smtp, &from, &config.from_name)?)
        }
        MailTransport::Log => Arc::new(LogNotifier),
    };
    Ok(notifier)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn confirmation(qr_code: Option<PathBuf>) -> Confirmation {
        Confirmation {
            to: Email::parse("asha@qaoncloud.com").unwrap(),
            name: "Asha <Rao>".to_string(),
            attendee_id: AttendeeId::parse("E100").unwrap(),
            verify_url: "https://summit.qaoncloud.com/verify/E100".to_string(),
            qr_code,
        }
    }

    #[tokio::test]
    async fn test_compose_without_attachment() {
        let message = RenderedMessage::compose(&confirmation(None)).await.unwrap();

        assert_eq!(message.subject, CONFIRMATION_SUBJECT);
        assert!(message.text.contains("Hi Asha <Rao>,"));
        assert!(message.text.contains("E100"));
        assert!(!message.html.contains("Asha <Rao>"));
        assert!(message.html.contains("https://summit.qaoncloud.com/verify/E100"));
        assert!(message.attachment.is_none());
    }

    #[tokio::test]
    async fn test_compose_reads_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code.png");
        std::fs::write(&path, b"png-bytes").unwrap();

        let message = RenderedMessage::compose(&confirmation(Some(path)))
            .await
            .unwrap();

        let attachment = message.attachment.unwrap();
        assert_eq!(attachment.file_name, "summit-pass-E100.png");
        assert_eq!(attachment.content_type, "image/png");
        assert_eq!(attachment.bytes, b"png-bytes");
    }

    #[tokio::test]
    async fn test_compose_missing_attachment_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = RenderedMessage::compose(&confirmation(Some(dir.path().join("gone.png"))))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Attachment(_)));
    }

    #[test]
    fn test_from_config_log_backend() {
        let config = MailConfig {
            from_address: None,
            from_name: "Summit Team".to_string(),
            transport: MailTransport::Log,
        };
        assert!(from_config(&config).is_ok());
    }
}
