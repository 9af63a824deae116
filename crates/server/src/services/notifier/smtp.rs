//! SMTP delivery via lettre.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;

use summit_core::Email;

use super::{Confirmation, Notifier, NotifyError, RenderedMessage};
use crate::config::SmtpConfig;

/// Port that speaks TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Sends confirmations by SMTP submission.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Create a new SMTP notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host or sender address is invalid.
    pub fn new(config: &SmtpConfig, from: &Email, from_name: &str) -> Result<Self, NotifyError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };
        let mailer = builder.port(config.port).credentials(credentials).build();

        Ok(Self {
            mailer,
            from: mailbox(from, from_name)?,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_confirmation(&self, confirmation: &Confirmation) -> Result<(), NotifyError> {
        let rendered = RenderedMessage::compose(confirmation).await?;
        let email = build_message(&self.from, confirmation, rendered)?;

        self.mailer.send(email).await?;

        tracing::info!(to = %confirmation.to, "Confirmation email sent via SMTP");
        Ok(())
    }
}

fn mailbox(address: &Email, name: &str) -> Result<Mailbox, NotifyError> {
    let parsed = address
        .as_str()
        .parse()
        .map_err(|_| NotifyError::InvalidAddress(address.to_string()))?;
    Ok(Mailbox::new(Some(name.to_string()), parsed))
}

/// Assemble the MIME message: text and HTML alternatives plus the QR code.
fn build_message(
    from: &Mailbox,
    confirmation: &Confirmation,
    rendered: RenderedMessage,
) -> Result<Message, NotifyError> {
    let body = MultiPart::alternative()
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(rendered.text),
        )
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(rendered.html),
        );

    let body = match rendered.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse(attachment.content_type)
                .map_err(|e| NotifyError::InvalidAddress(format!("content type: {e}")))?;
            MultiPart::mixed()
                .multipart(body)
                .singlepart(
                    MailAttachment::new(attachment.file_name).body(attachment.bytes, content_type),
                )
        }
        None => body,
    };

    let email = Message::builder()
        .from(from.clone())
        .to(mailbox(&confirmation.to, &confirmation.name)?)
        .subject(rendered.subject)
        .multipart(body)?;
    Ok(email)
}
