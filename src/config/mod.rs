use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::auth::Role;
use crate::services::notifications::DEFAULT_SEND_PAUSE;
use crate::store::sheets::DEFAULT_SHEETS_API;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Google Sheets connection. Absent means the in-memory store is used.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub api_base: String,
    pub spreadsheet_id: String,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from_email: String,
    pub from_name: String,
    pub event_name: String,
    pub send_pause: Duration,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub admin_password: String,
    pub limited_password: Option<String>,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
}

impl AuthConfig {
    /// Role granted by `password`, compared in constant time.
    pub fn role_for(&self, password: &str) -> Option<Role> {
        let matches =
            |secret: &str| constant_time_eq::constant_time_eq(secret.as_bytes(), password.as_bytes());

        if matches(self.admin_password.as_str()) {
            Some(Role::Admin)
        } else if self.limited_password.as_deref().is_some_and(matches) {
            Some(Role::Limited)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_password", &"<redacted>")
            .field("limited_password", &self.limited_password.as_ref().map(|_| "<redacted>"))
            .field("session_ttl", &self.session_ttl)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub cors_origins: String,
    pub sheets: Option<SheetsConfig>,
    pub tickets_sheet: String,
    pub badges_sheet: String,
    pub auth: AuthConfig,
    pub smtp: Option<SmtpConfig>,
    pub mail: MailConfig,
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn session_ttl() -> Result<Duration, ConfigError> {
    const NAME: &str = "SESSION_TTL_HOURS";
    let hours: u64 = parsed(NAME, 12)?;
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            name: NAME,
            value: hours.to_string(),
        })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let sheets = match optional("SPREADSHEET_ID") {
            Some(spreadsheet_id) => Some(SheetsConfig {
                api_base: optional("SHEETS_API_BASE")
                    .unwrap_or_else(|| DEFAULT_SHEETS_API.to_string()),
                spreadsheet_id,
                access_token: required("GOOGLE_ACCESS_TOKEN")?,
            }),
            None => None,
        };

        let smtp = match optional("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parsed("SMTP_PORT", 587)?,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
            }),
            None => None,
        };

        let is_production = env::var("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        Ok(Self {
            bind_addr: parsed("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3001)))?,
            cors_origins: optional("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| cors::DEFAULT_ALLOWED_ORIGINS.to_string()),
            sheets,
            tickets_sheet: optional("TICKETS_SHEET").unwrap_or_else(|| "Tickets".to_string()),
            badges_sheet: optional("BADGES_SHEET").unwrap_or_else(|| "Badges".to_string()),
            auth: AuthConfig {
                admin_password: required("ADMIN_PASSWORD")?,
                limited_password: optional("LIMITED_PASSWORD"),
                session_ttl: session_ttl()?,
                secure_cookies: is_production,
            },
            smtp,
            mail: MailConfig {
                from_email: optional("MAIL_FROM").unwrap_or_else(|| "badges@localhost".to_string()),
                from_name: optional("MAIL_FROM_NAME").unwrap_or_else(|| "Event Check-in".to_string()),
                event_name: optional("EVENT_NAME").unwrap_or_else(|| "the event".to_string()),
                send_pause: parsed("EMAIL_SEND_PAUSE_MS", DEFAULT_SEND_PAUSE.as_millis() as u64)
                    .map(Duration::from_millis)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthConfig {
        AuthConfig {
            admin_password: "door-admin".to_string(),
            limited_password: Some("door-scan".to_string()),
            session_ttl: Duration::from_secs(3600),
            secure_cookies: false,
        }
    }

    #[test]
    fn test_role_for_password() {
        let auth = auth();
        assert_eq!(auth.role_for("door-admin"), Some(Role::Admin));
        assert_eq!(auth.role_for("door-scan"), Some(Role::Limited));
        assert_eq!(auth.role_for("door-admin "), None);
        assert_eq!(auth.role_for(""), None);
    }

    #[test]
    fn test_limited_role_disabled_without_password() {
        let auth = AuthConfig {
            limited_password: None,
            ..auth()
        };
        assert_eq!(auth.role_for("door-scan"), None);
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let rendered = format!("{:?}", auth());
        assert!(!rendered.contains("door-admin"));
        assert!(!rendered.contains("door-scan"));
    }

    #[test]
    fn test_parsed_rejects_garbage() {
        std::env::set_var("CHECKIN_TEST_PORT", "not-a-port");
        let result: Result<u16, _> = parsed("CHECKIN_TEST_PORT", 1);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        std::env::remove_var("CHECKIN_TEST_PORT");
    }

    #[test]
    fn test_session_ttl_overflow_is_rejected() {
        std::env::set_var("SESSION_TTL_HOURS", u64::MAX.to_string());
        let overflow = session_ttl();
        std::env::set_var("SESSION_TTL_HOURS", "2");
        let two_hours = session_ttl();
        std::env::remove_var("SESSION_TTL_HOURS");

        assert!(matches!(
            overflow,
            Err(ConfigError::Invalid { name: "SESSION_TTL_HOURS", .. })
        ));
        assert_eq!(two_hours.unwrap(), Duration::from_secs(7200));
    }
}
