//! Axum extractors for the session cookie.
//!
//! ```rust,ignore
//! async fn scan(user: SessionUser, ...) -> Result<Response, AppError> { ... }
//! async fn issue(_admin: RequireAdmin, ...) -> Result<Response, AppError> { ... }
//! ```

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::cookies::read_cookie;
use super::{Role, SESSION_COOKIE};
use crate::state::AppState;
use crate::utils::error::AppError;

/// Any logged-in operator.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub token: String,
    pub role: Role,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with 403 unless the session holds the admin role.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "This action requires the admin role".to_string(),
            ))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = read_cookie(&parts.headers, SESSION_COOKIE)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::AuthError("Not logged in".to_string()))?;

        let session = state
            .sessions
            .get(&token)
            .await
            .ok_or_else(|| AppError::AuthError("Session expired or invalid".to_string()))?;

        Ok(Self {
            token,
            role: session.role,
        })
    }
}

/// Logged-in operator holding the admin role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = SessionUser::from_request_parts(parts, state).await?;
        user.require_admin()?;
        Ok(Self(user))
    }
}
