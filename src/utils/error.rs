use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid day: {message}")]
    InvalidDay { message: String, valid_days: Vec<u8> },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Badge {badge_id} has already been scanned for day {day}")]
    AlreadyScanned {
        badge_id: String,
        day: u8,
        scanned_at: DateTime<Utc>,
    },

    #[error("Ticket {ticket_id} has already been redeemed")]
    AlreadyRedeemed {
        ticket_id: String,
        redeemed_at: Option<DateTime<Utc>>,
    },

    #[error("Failed to generate a unique {kind} id after {attempts} attempts")]
    GenerationExhausted { kind: &'static str, attempts: usize },

    #[error("Row store error")]
    StoreError(#[from] StoreError),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidDay { .. } => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyScanned { .. } | AppError::AlreadyRedeemed { .. } => {
                StatusCode::CONFLICT
            }
            AppError::StoreError(_) | AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::GenerationExhausted { .. } | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidDay { .. } => "INVALID_DAY",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyScanned { .. } => "ALREADY_SCANNED",
            AppError::AlreadyRedeemed { .. } => "ALREADY_REDEEMED",
            AppError::GenerationExhausted { .. } => "GENERATION_EXHAUSTED",
            AppError::StoreError(_) => "STORE_ERROR",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Machine-readable context the caller needs to correct the request.
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::InvalidDay { valid_days, .. } => Some(json!({ "badgeValidDays": valid_days })),
            AppError::AlreadyScanned {
                day, scanned_at, ..
            } => Some(json!({ "day": day, "scannedAt": scanned_at })),
            AppError::AlreadyRedeemed { redeemed_at, .. } => {
                Some(json!({ "redeemedAt": redeemed_at }))
            }
            _ => None,
        }
    }

    fn log(&self) {
        match self {
            AppError::StoreError(e) => {
                error!(error = ?e, "Row store error");
            }
            AppError::ExternalServiceError(msg) | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::GenerationExhausted { .. } => {
                error!(error = %self, "Application error");
            }
            _ => {
                warn!(code = self.code(), error = %self, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::ExternalServiceError(msg) => msg.clone(),
            AppError::InvalidDay { message, .. } => message.clone(),
            AppError::AlreadyScanned { .. }
            | AppError::AlreadyRedeemed { .. }
            | AppError::GenerationExhausted { .. } => self.to_string(),
            AppError::StoreError(_) => "The ticket store is unavailable".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        };

        error_response(code, public_message, self.details(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_day_exposes_valid_days() {
        let err = AppError::InvalidDay {
            message: "Badge is not valid for day 1".to_string(),
            valid_days: vec![2, 3],
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.details(), Some(json!({ "badgeValidDays": [2, 3] })));
    }

    #[test]
    fn test_store_errors_map_to_bad_gateway() {
        let err = AppError::from(StoreError::Api {
            status: 503,
            body: "backend down".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "STORE_ERROR");
        assert!(err.details().is_none());
    }
}
