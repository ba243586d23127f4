//! Outgoing mail transport.

use async_trait::async_trait;
use thiserror::Error;

pub mod smtp;

pub use smtp::SmtpMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("failed to send message: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Logs messages instead of sending them. Used when no SMTP relay is configured.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            text_len = email.text_body.len(),
            html_len = email.html_body.len(),
            "SMTP not configured, email logged instead of sent"
        );
        Ok(())
    }
}
