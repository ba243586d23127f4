use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::barcode::{self, BarcodeError, SvgOptions};
use crate::mail::{Mailer, OutgoingEmail};
use crate::models::{Badge, BadgeType};

pub const DEFAULT_SEND_PAUSE: Duration = Duration::from_millis(100);
pub const MAX_BADGES_PER_BATCH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    NoEmail,
}

/// Outcome for one badge in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailResult {
    pub badge_id: String,
    pub success: bool,
    pub status: DeliveryStatus,
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmailResult {
    fn sent(badge: &Badge, email: &str) -> Self {
        Self {
            badge_id: badge.badge_id.clone(),
            success: true,
            status: DeliveryStatus::Sent,
            email: Some(email.to_string()),
            error: None,
        }
    }

    fn failed(badge_id: &str, email: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            badge_id: badge_id.to_string(),
            success: false,
            status: DeliveryStatus::Failed,
            email: email.map(str::to_string),
            error: Some(error.into()),
        }
    }

    fn no_email(badge: &Badge) -> Self {
        Self {
            badge_id: badge.badge_id.clone(),
            success: false,
            status: DeliveryStatus::NoEmail,
            email: badge.email.clone(),
            error: Some("Badge has no valid email address".to_string()),
        }
    }

    /// Result for an id that did not resolve to a badge.
    pub fn not_found(badge_id: &str) -> Self {
        Self::failed(badge_id, None, "Badge not found")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub no_email: usize,
}

pub fn summarize(results: &[EmailResult]) -> EmailSummary {
    results.iter().fold(
        EmailSummary {
            total: results.len(),
            ..Default::default()
        },
        |mut summary, result| {
            match result.status {
                DeliveryStatus::Sent => summary.sent += 1,
                DeliveryStatus::Failed => summary.failed += 1,
                DeliveryStatus::NoEmail => summary.no_email += 1,
            }
            summary
        },
    )
}

/// Emails each badge its barcode, one at a time.
pub struct BadgeEmailDispatcher {
    mailer: Arc<dyn Mailer>,
    event_name: String,
    pause: Duration,
}

impl BadgeEmailDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, event_name: impl Into<String>) -> Self {
        Self {
            mailer,
            event_name: event_name.into(),
            pause: DEFAULT_SEND_PAUSE,
        }
    }

    /// Delay between consecutive sends.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn compose(&self, badge: &Badge, to: &str) -> Result<OutgoingEmail, BarcodeError> {
        let barcode = barcode::svg_data_uri(&badge.badge_id, SvgOptions::default())?;
        let days = match badge.badge_type {
            BadgeType::MultidayBadge => badge
                .days
                .iter()
                .map(|d| format!("Day {d}"))
                .collect::<Vec<_>>()
                .join(", "),
            BadgeType::Badge => "All days".to_string(),
        };
        let companion = badge
            .companion
            .as_deref()
            .map(|c| format!("Companion: {c}\n"))
            .unwrap_or_default();

        let text_body = format!(
            "Hello {name},\n\n\
             Your badge for {event} is ready.\n\n\
             Badge ID: {id}\n\
             Department: {department}\n\
             Valid: {days}\n\
             {companion}\n\
             Show the barcode in this email at the entrance to check in.\n",
            name = badge.name,
            event = self.event_name,
            id = badge.badge_id,
            department = badge.department,
        );

        let companion_html = badge
            .companion
            .as_deref()
            .map(|c| format!("<p style=\"margin: 4px 0;\">Companion: {}</p>", escape_html(c)))
            .unwrap_or_default();
        let html_body = format!(
            r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Your badge</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">{event}</h2>
        <p>Hello {name}, your badge is ready.</p>
        <div style="border: 1px solid #ddd; border-radius: 8px; padding: 16px; text-align: center;">
            <p style="margin: 4px 0; font-size: 18px;"><strong>{name}</strong></p>
            <p style="margin: 4px 0;">{department}</p>
            <p style="margin: 4px 0;">{days}</p>
            {companion_html}
            <img src="{barcode}" alt="{id}" style="margin-top: 12px; max-width: 100%;">
        </div>
        <p style="color: #666; font-size: 14px;">
            Show this barcode at the entrance to check in.
        </p>
    </div>
</body>
</html>
            "#,
            event = escape_html(&self.event_name),
            name = escape_html(&badge.name),
            department = escape_html(&badge.department),
            id = escape_html(&badge.badge_id),
        );

        Ok(OutgoingEmail {
            to: to.to_string(),
            subject: format!("Your badge for {}", self.event_name),
            text_body,
            html_body,
        })
    }

    /// Sends one email per badge, in order. A failure is recorded for that
    /// badge and the batch carries on.
    pub async fn send_badge_emails(&self, badges: &[Badge]) -> Vec<EmailResult> {
        let mut results = Vec::with_capacity(badges.len());
        let mut attempted = false;

        for badge in badges {
            let Some(to) = badge.email.as_deref().filter(|e| e.contains('@')) else {
                tracing::debug!(badge_id = %badge.badge_id, "No usable email address");
                results.push(EmailResult::no_email(badge));
                continue;
            };

            if attempted && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            attempted = true;

            let result = match self.compose(badge, to) {
                Ok(message) => match self.mailer.send(message).await {
                    Ok(()) => {
                        tracing::info!(badge_id = %badge.badge_id, to, "Badge email sent");
                        EmailResult::sent(badge, to)
                    }
                    Err(e) => {
                        tracing::warn!(badge_id = %badge.badge_id, to, error = %e, "Badge email failed");
                        EmailResult::failed(&badge.badge_id, Some(to), e.to_string())
                    }
                },
                Err(e) => {
                    tracing::warn!(badge_id = %badge.badge_id, error = %e, "Barcode rendering failed");
                    EmailResult::failed(&badge.badge_id, Some(to), e.to_string())
                }
            };
            results.push(result);
        }

        results
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
