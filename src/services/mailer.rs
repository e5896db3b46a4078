use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use std::collections::HashMap;
use std::sync::Mutex;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{info, warn};

use crate::server::config::PasswordResetSettings;

// Rendered without HTML escaping; values go through `json_encode` instead.
const DEFAULT_BODY_TEMPLATE: &str = r#"{"email": {{ email | json_encode() }}, "subject": "Reset your password", "reset_url": {{ reset_url | json_encode() }}, "expires_at": {{ expires_at | json_encode() }}}"#;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Failed to send reset message: {0}")]
    SendFailed(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Templating error: {0}")]
    TemplatingError(String),
}

/// Everything a reset message needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetMessage {
    pub email: String,
    pub token: String,
    pub reset_url: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetMessage {
    fn context(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("email", self.email.clone()),
            ("token", self.token.clone()),
            ("reset_url", self.reset_url.clone()),
            ("expires_at", self.expires_at.to_rfc3339()),
        ])
    }
}

/// Delivers password-reset messages.
#[async_trait]
pub trait ResetMailer: Send + Sync {
    async fn send_reset(&self, message: &ResetMessage) -> Result<(), MailerError>;
}

/// Renders the reset body with Tera and POSTs it to a webhook.
pub struct WebhookMailer {
    client: Client,
    webhook_url: Option<String>,
    body_template: String,
}

impl WebhookMailer {
    pub fn new(settings: &PasswordResetSettings) -> Self {
        Self {
            client: Client::new(),
            webhook_url: settings.webhook_url.clone(),
            body_template: settings
                .body_template
                .clone()
                .unwrap_or_else(|| DEFAULT_BODY_TEMPLATE.to_string()),
        }
    }

    pub fn render(&self, message: &ResetMessage) -> Result<String, MailerError> {
        let mut tera_context = Context::new();
        for (key, value) in message.context() {
            tera_context.insert(key, &value);
        }
        Tera::one_off(&self.body_template, &tera_context, false)
            .map_err(|e| MailerError::TemplatingError(e.to_string()))
    }
}

#[async_trait]
impl ResetMailer for WebhookMailer {
    async fn send_reset(&self, message: &ResetMessage) -> Result<(), MailerError> {
        let Some(url) = self.webhook_url.as_deref() else {
            warn!(email = %message.email, "No reset webhook configured. Reset message not delivered.");
            return Ok(());
        };

        let rendered_body = self.render(message)?;
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(rendered_body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(MailerError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }

        info!(email = %message.email, "Reset message delivered.");
        Ok(())
    }
}

/// Keeps messages in memory. Used by tests and local development.
#[derive(Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<ResetMessage>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ResetMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ResetMailer for OutboxMailer {
    async fn send_reset(&self, message: &ResetMessage) -> Result<(), MailerError> {
        self.sent
            .lock()
            .map_err(|_| MailerError::SendFailed("outbox lock poisoned".to_string()))?
            .push(message.clone());
        Ok(())
    }
}
