//! `SendGrid` v3 mail-send client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;

use summit_core::Email;

use super::{Confirmation, Notifier, NotifyError, RenderedMessage};
use crate::config::SendGridConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends confirmations through the `SendGrid` HTTP API.
#[derive(Clone)]
pub struct SendGridNotifier {
    client: reqwest::Client,
    endpoint: String,
    from: EmailAddress,
}

impl SendGridNotifier {
    /// Create a new `SendGrid` client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &SendGridConfig, from: Email, from_name: &str) -> Result<Self, NotifyError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
            .map_err(|e| NotifyError::InvalidAddress(format!("Invalid API key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v3/mail/send", config.api_base.trim_end_matches('/')),
            from: EmailAddress {
                email: from.into_inner(),
                name: Some(from_name.to_string()),
            },
        })
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    async fn send_confirmation(&self, confirmation: &Confirmation) -> Result<(), NotifyError> {
        let message = RenderedMessage::compose(confirmation).await?;
        let payload = MailSend::new(&self.from, confirmation, &message);

        let response = self.client.post(&self.endpoint).json(&payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(to = %confirmation.to, "Confirmation email accepted by SendGrid");
        Ok(())
    }
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct MailAttachment<'a> {
    content: String,
    #[serde(rename = "type")]
    kind: &'static str,
    filename: &'a str,
    disposition: &'static str,
}

#[derive(Debug, Serialize)]
struct MailSend<'a> {
    personalizations: Vec<Personalization>,
    from: &'a EmailAddress,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<MailAttachment<'a>>,
}

impl<'a> MailSend<'a> {
    fn new(
        from: &'a EmailAddress,
        confirmation: &Confirmation,
        message: &'a RenderedMessage,
    ) -> Self {
        let attachments = message
            .attachment
            .iter()
            .map(|a| MailAttachment {
                content: STANDARD.encode(&a.bytes),
                kind: a.content_type,
                filename: &a.file_name,
                disposition: "attachment",
            })
            .collect();

        Self {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: confirmation.to.as_str().to_string(),
                    name: Some(confirmation.name.clone()),
                }],
            }],
            from,
            subject: &message.subject,
            // text/plain must precede text/html
            content: vec![
                Content {
                    kind: "text/plain",
                    value: &message.text,
                },
                Content {
                    kind: "text/html",
                    value: &message.html,
                },
            ],
            attachments,
        }
    }
}
