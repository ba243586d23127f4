use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

fn with_status<T>(status: StatusCode, data: Option<T>, message: String) -> Response
where
    T: Serialize,
{
    let body = ApiResponse {
        success: true,
        data,
        message: Some(message),
    };
    (status, Json(body)).into_response()
}

pub fn success<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    with_status(StatusCode::OK, Some(data), message.into())
}

pub fn created<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    with_status(StatusCode::CREATED, Some(data), message.into())
}

pub fn empty_success(message: impl Into<String>) -> Response {
    with_status::<()>(StatusCode::OK, None, message.into())
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        success: false,
        error: ApiErrorBody {
            code: code.to_string(),
            message: message.into(),
            details,
        },
    };

    (status, Json(body)).into_response()
}
