use std::sync::Arc;

use crate::auth::SessionStore;
use crate::config::AuthConfig;
use crate::services::badges::BadgeService;
use crate::services::notifications::BadgeEmailDispatcher;
use crate::services::tickets::TicketService;
use crate::store::RowStore;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub tickets: Arc<TicketService>,
    pub badges: Arc<BadgeService>,
    pub emails: Arc<BadgeEmailDispatcher>,
    pub sessions: Arc<SessionStore>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RowStore>,
        tickets_sheet: &str,
        badges_sheet: &str,
        emails: BadgeEmailDispatcher,
        auth: AuthConfig,
    ) -> Self {
        Self {
            tickets: Arc::new(TicketService::new(store.clone(), tickets_sheet)),
            badges: Arc::new(BadgeService::new(store, badges_sheet)),
            emails: Arc::new(emails),
            sessions: Arc::new(SessionStore::new(auth.session_ttl)),
            auth: Arc::new(auth),
        }
    }
}
