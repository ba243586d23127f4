use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::str::FromStr;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod auth;
pub mod badges;
pub mod emails;
pub mod tickets;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "checkin-server",
    };

    success(payload, "Health check successful")
}

/// Parses an optional query filter, rejecting unknown values.
pub(crate) fn parse_filter<T>(raw: Option<&str>, name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr<Err = String>,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|e| {
            AppError::ValidationError(format!("Invalid {name} filter: {e}"))
        }),
    }
}

/// `image/svg+xml` response for a barcode.
pub(crate) fn svg_response(svg: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "private, max-age=300"),
        ],
        svg,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketStatus;

    #[test]
    fn test_parse_filter() {
        let none: Option<TicketStatus> = parse_filter(None, "status").unwrap();
        assert_eq!(none, None);
        let blank: Option<TicketStatus> = parse_filter(Some("  "), "status").unwrap();
        assert_eq!(blank, None);
        assert_eq!(
            parse_filter::<TicketStatus>(Some("redeemed"), "status").unwrap(),
            Some(TicketStatus::Redeemed)
        );
        assert!(parse_filter::<TicketStatus>(Some("lost"), "status").is_err());
    }
}
