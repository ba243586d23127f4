use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{auth, badges, emails, health_check, tickets};
use crate::state::AppState;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::current_session))
}

fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(tickets::create_tickets).get(tickets::list_tickets))
        .route("/:id", get(tickets::get_ticket).patch(tickets::update_ticket))
        .route("/:id/code.svg", get(tickets::ticket_code))
}

fn badge_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(badges::create_badge).get(badges::list_badges))
        .route("/email", post(emails::send_badge_emails))
        .route(
            "/:id",
            get(badges::get_badge)
                .patch(badges::update_badge)
                .put(badges::replace_badge),
        )
        .route("/:id/reset", post(badges::reset_badge))
        .route("/:id/code.svg", get(badges::badge_code))
}

/// Full application router with middleware applied.
pub fn create_routes(state: AppState, cors_origins: &str, include_hsts: bool) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes())
        .nest("/api/tickets", ticket_routes())
        .nest("/api/badges", badge_routes())
        .with_state(state)
        .layer(create_security_headers_layer(include_hsts))
        .layer(create_cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}
