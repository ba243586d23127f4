use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::{MailError, Mailer, OutgoingEmail};

/// SMTP relay mailer.
///
/// Sends multipart/alternative messages (plain text and HTML). The blocking
/// lettre transport runs on the blocking thread pool.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        smtp_server: &str,
        smtp_port: u16,
        smtp_username: String,
        smtp_password: String,
        from_email: &str,
        from_name: &str,
    ) -> Result<Self, MailError> {
        let from: Mailbox = format!("{from_name} <{from_email}>")
            .parse()
            .map_err(|e| MailError::Address(format!("from address: {e}")))?;

        let transport = SmtpTransport::starttls_relay(smtp_server)
            .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?
            .port(smtp_port)
            .credentials(Credentials::new(smtp_username, smtp_password))
            .build();

        Ok(Self { transport, from })
    }

    fn build_message(&self, email: OutgoingEmail) -> Result<Message, MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {e}", email.to)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(
                email.text_body,
                email.html_body,
            ))
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = self.build_message(email)?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || {
            transport
                .send(&message)
                .map_err(|e| MailError::Transport(e.to_string()))
        })
        .await
        .map_err(|e| MailError::Transport(format!("email task failed: {e}")))?
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(
            "smtp.example.com",
            587,
            "user".to_string(),
            "secret".to_string(),
            "badges@example.com",
            "Front Desk",
        )
        .unwrap()
    }

    #[test]
    fn test_builds_multipart_message() {
        let message = mailer()
            .build_message(OutgoingEmail {
                to: "ada@example.com".to_string(),
                subject: "Your badge".to_string(),
                text_body: "plain".to_string(),
                html_body: "<p>html</p>".to_string(),
            })
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: ada@example.com"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Subject: Your badge"));
    }

    #[test]
    fn test_rejects_bad_recipient() {
        let result = mailer().build_message(OutgoingEmail {
            to: "nobody".to_string(),
            subject: "Your badge".to_string(),
            text_body: String::new(),
            html_body: String::new(),
        });
        assert!(matches!(result, Err(MailError::Address(_))));
    }
}
