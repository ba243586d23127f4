use axum::Router;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use checkin_server::config::Config;
use checkin_server::mail::{LogMailer, Mailer, SmtpMailer};
use checkin_server::routes::create_routes;
use checkin_server::services::notifications::BadgeEmailDispatcher;
use checkin_server::state::AppState;
use checkin_server::store::{MemoryStore, RowStore, SheetsStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let store: Arc<dyn RowStore> = match &config.sheets {
        Some(sheets) => {
            tracing::info!(spreadsheet_id = %sheets.spreadsheet_id, "Using Google Sheets row store");
            Arc::new(
                SheetsStore::new(&sheets.api_base, &sheets.spreadsheet_id, &sheets.access_token)
                    .expect("Invalid Sheets configuration"),
            )
        }
        None => {
            tracing::warn!("SPREADSHEET_ID not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(
            SmtpMailer::new(
                &smtp.host,
                smtp.port,
                smtp.username.clone(),
                smtp.password.clone(),
                &config.mail.from_email,
                &config.mail.from_name,
            )
            .expect("Invalid SMTP configuration"),
        ),
        None => {
            tracing::warn!("SMTP_HOST not set, badge emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let emails = BadgeEmailDispatcher::new(mailer, config.mail.event_name.clone())
        .with_pause(config.mail.send_pause);
    let state = AppState::new(
        store,
        &config.tickets_sheet,
        &config.badges_sheet,
        emails,
        config.auth.clone(),
    );

    let migrated = state
        .tickets
        .ensure_layout()
        .await
        .expect("Failed to prepare ticket sheet");
    tracing::info!(sheet = %config.tickets_sheet, migrated, "Ticket sheet ready");

    let migrated = state
        .badges
        .ensure_layout()
        .await
        .expect("Failed to prepare badge sheet");
    tracing::info!(sheet = %config.badges_sheet, migrated, "Badge sheet ready");

    let app: Router = create_routes(state, &config.cors_origins, config.auth.secure_cookies);

    tracing::info!("🚀 Server running at http://{}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
