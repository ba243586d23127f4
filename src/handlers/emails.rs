use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::auth::RequireAdmin;
use crate::services::notifications::{summarize, EmailResult, EmailSummary, MAX_BADGES_PER_BATCH};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::json::ValidJson;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailsRequest {
    pub badge_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SendEmailsPayload {
    pub results: Vec<EmailResult>,
    pub summary: EmailSummary,
}

/// Emails each requested badge its barcode. Unknown ids are reported as
/// failed entries; results follow the request order.
pub async fn send_badge_emails(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ValidJson(payload): ValidJson<SendEmailsRequest>,
) -> Result<Response, AppError> {
    let ids: Vec<String> = payload
        .badge_ids
        .iter()
        .map(|id| id.trim().to_string())
        .collect();
    if ids.is_empty() || ids.len() > MAX_BADGES_PER_BATCH {
        return Err(AppError::ValidationError(format!(
            "badgeIds must contain between 1 and {MAX_BADGES_PER_BATCH} ids"
        )));
    }

    let resolved = state.badges.get_badges(&ids).await?;
    let found: Vec<_> = resolved.iter().filter_map(|(_, badge)| badge.clone()).collect();
    let mut delivered = state.emails.send_badge_emails(&found).await.into_iter();

    let mut results = Vec::with_capacity(resolved.len());
    for (id, badge) in &resolved {
        let result = match badge {
            Some(_) => delivered.next(),
            None => None,
        };
        results.push(result.unwrap_or_else(|| EmailResult::not_found(id)));
    }

    let summary = summarize(&results);
    tracing::info!(
        total = summary.total,
        sent = summary.sent,
        failed = summary.failed,
        no_email = summary.no_email,
        "Badge email batch finished"
    );

    let message = format!("Sent {} of {} email(s)", summary.sent, summary.total);
    Ok(success(SendEmailsPayload { results, summary }, message))
}
