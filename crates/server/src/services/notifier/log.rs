//! Log-only notifier for local development.

use async_trait::async_trait;

use super::{Confirmation, Notifier, NotifyError, RenderedMessage};

/// Renders the confirmation and logs it instead of sending.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_confirmation(&self, confirmation: &Confirmation) -> Result<(), NotifyError> {
        let message = RenderedMessage::compose(confirmation).await?;
        tracing::info!(
            to = %confirmation.to,
            subject = %message.subject,
            attachment = message.attachment.as_ref().map(|a| a.file_name.as_str()),
            body = %message.text,
            "Email delivery not configured; confirmation logged"
        );
        Ok(())
    }
}
