use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::auth::cookies::{clear_cookie, read_cookie, set_cookie};
use crate::auth::{Role, SessionUser, ROLE_COOKIE, SESSION_COOKIE};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::json::ValidJson;
use crate::utils::response::{empty_success, success};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionPayload {
    pub role: Role,
}

fn append_cookie(response: &mut Response, cookie: String) -> Result<(), AppError> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::InternalServerError(format!("Invalid cookie header: {e}")))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Response, AppError> {
    let role = state.auth.role_for(&payload.password).ok_or_else(|| {
        tracing::warn!("Login rejected: wrong password");
        AppError::AuthError("Invalid password".to_string())
    })?;

    let token = state.sessions.create(role).await;
    let ttl = state.sessions.ttl();
    let secure = state.auth.secure_cookies;

    let mut response = success(SessionPayload { role }, "Logged in");
    append_cookie(&mut response, set_cookie(SESSION_COOKIE, &token, ttl, true, secure))?;
    append_cookie(&mut response, set_cookie(ROLE_COOKIE, role.as_str(), ttl, false, secure))?;
    Ok(response)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = read_cookie(&headers, SESSION_COOKIE) {
        if state.sessions.revoke(&token).await {
            tracing::info!("Session ended");
        }
    }

    let secure = state.auth.secure_cookies;
    let mut response = empty_success("Logged out");
    append_cookie(&mut response, clear_cookie(SESSION_COOKIE, secure))?;
    append_cookie(&mut response, clear_cookie(ROLE_COOKIE, secure))?;
    Ok(response)
}

pub async fn current_session(user: SessionUser) -> Response {
    success(SessionPayload { role: user.role }, "Session active")
}
