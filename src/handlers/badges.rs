use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::auth::{RequireAdmin, SessionUser};
use crate::barcode::{self, SvgOptions};
use crate::handlers::{parse_filter, svg_response};
use crate::models::{Badge, BadgeType, BadgeView};
use crate::services::badges::BadgeInput;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::json::ValidJson;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct ListBadgesQuery {
    #[serde(rename = "type")]
    pub badge_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BadgeAction {
    CheckIn,
    Reset,
    View,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBadgeRequest {
    pub action: BadgeAction,
    pub selected_day: Option<u8>,
}

async fn find_badge(state: &AppState, id: &str) -> Result<Badge, AppError> {
    state
        .badges
        .get_badge(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Badge '{id}' was not found")))
}

pub async fn create_badge(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ValidJson(payload): ValidJson<BadgeInput>,
) -> Result<Response, AppError> {
    let badge = state.badges.create_badge(payload).await?;
    Ok(created(BadgeView::from(badge), "Badge created"))
}

pub async fn list_badges(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListBadgesQuery>,
) -> Result<Response, AppError> {
    let badge_type = parse_filter::<BadgeType>(query.badge_type.as_deref(), "type")?;
    let badges: Vec<BadgeView> = state
        .badges
        .get_all_badges(badge_type)
        .await?
        .into_iter()
        .map(BadgeView::from)
        .collect();
    Ok(success(badges, "Badges retrieved"))
}

pub async fn get_badge(
    State(state): State<AppState>,
    _user: SessionUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let badge = find_badge(&state, &id).await?;
    Ok(success(BadgeView::from(badge), "Badge retrieved"))
}

pub async fn update_badge(
    State(state): State<AppState>,
    user: SessionUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateBadgeRequest>,
) -> Result<Response, AppError> {
    let (badge, message) = match payload.action {
        BadgeAction::CheckIn => (
            state.badges.update_badge_check_in(&id, payload.selected_day).await?,
            "Badge checked in",
        ),
        BadgeAction::Reset => {
            user.require_admin()?;
            (state.badges.reset_badge(&id).await?, "Badge reset")
        }
        BadgeAction::View => (find_badge(&state, &id).await?, "Badge retrieved"),
    };
    Ok(success(BadgeView::from(badge), message))
}

pub async fn replace_badge(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<BadgeInput>,
) -> Result<Response, AppError> {
    let badge = state.badges.update_badge_details(&id, payload).await?;
    Ok(success(BadgeView::from(badge), "Badge updated"))
}

pub async fn reset_badge(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let badge = state.badges.reset_badge(&id).await?;
    Ok(success(BadgeView::from(badge), "Badge reset"))
}

pub async fn badge_code(
    State(state): State<AppState>,
    _user: SessionUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let badge = find_badge(&state, &id).await?;
    let svg = barcode::render_svg(&badge.badge_id, SvgOptions::default())
        .map_err(|e| AppError::InternalServerError(format!("Barcode rendering failed: {e}")))?;
    Ok(svg_response(svg))
}
