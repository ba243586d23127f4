use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::auth::{RequireAdmin, SessionUser};
use crate::barcode::{self, SvgOptions};
use crate::handlers::{parse_filter, svg_response};
use crate::models::{Ticket, TicketAction, TicketStatus, ValidDay};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::json::ValidJson;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketsRequest {
    pub quantity: usize,
    #[serde(default)]
    pub valid_day: ValidDay,
}

#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub action: TicketAction,
}

async fn find_ticket(state: &AppState, id: &str) -> Result<Ticket, AppError> {
    state
        .tickets
        .get_ticket(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{id}' was not found")))
}

pub async fn create_tickets(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ValidJson(payload): ValidJson<CreateTicketsRequest>,
) -> Result<Response, AppError> {
    let tickets = state
        .tickets
        .issue_tickets(payload.quantity, payload.valid_day)
        .await?;

    let message = format!("Created {} ticket(s) for {}", tickets.len(), payload.valid_day);
    Ok(created(tickets, message))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListTicketsQuery>,
) -> Result<Response, AppError> {
    let status = parse_filter::<TicketStatus>(query.status.as_deref(), "status")?;
    let tickets = state.tickets.list_tickets(status).await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    _user: SessionUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let ticket = find_ticket(&state, &id).await?;
    Ok(success(ticket, "Ticket retrieved"))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    user: SessionUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateTicketRequest>,
) -> Result<Response, AppError> {
    if payload.action == TicketAction::Reset {
        user.require_admin()?;
    }

    let ticket = state.tickets.update_ticket(&id, payload.action).await?;
    let message = match payload.action {
        TicketAction::Redeem => "Ticket redeemed",
        TicketAction::Reset => "Ticket reset",
        TicketAction::View => "Ticket retrieved",
    };
    Ok(success(ticket, message))
}

pub async fn ticket_code(
    State(state): State<AppState>,
    _user: SessionUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let ticket = find_ticket(&state, &id).await?;
    let svg = barcode::render_svg(&ticket.id, SvgOptions::default())
        .map_err(|e| AppError::InternalServerError(format!("Barcode rendering failed: {e}")))?;
    Ok(svg_response(svg))
}
