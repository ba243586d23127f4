use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-memory sessions keyed by token. Restarting the server logs everyone out.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a session and returns its token.
    pub async fn create(&self, role: Role) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(12));
        let session = Session {
            role,
            created_at: now,
            expires_at: now + ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(token.clone(), session);
        tracing::info!(role = %role, active_sessions = sessions.len(), "Session started");
        token
    }

    /// Live session for `token`; expired sessions are dropped.
    pub async fn get(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if session.expires_at > now => return Some(session.clone()),
                None => return None,
                Some(_) => {}
            }
        }
        self.sessions.write().await.remove(token);
        tracing::debug!("Expired session removed");
        None
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(Role::Limited).await;

        assert_eq!(token.len(), 32);
        let session = store.get(&token).await.unwrap();
        assert_eq!(session.role, Role::Limited);
        assert!(store.get("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let store = SessionStore::new(Duration::ZERO);
        let token = store.create(Role::Admin).await;
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(Role::Admin).await;
        assert!(store.revoke(&token).await);
        assert!(!store.revoke(&token).await);
        assert!(store.get(&token).await.is_none());
    }
}
