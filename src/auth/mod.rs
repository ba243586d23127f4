//! Shared-password login with cookie sessions.
//!
//! A correct password yields a random session token kept server-side with
//! its role. The `role` cookie only informs the UI; authorization always uses
//! the server-side session.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod cookies;
pub mod extract;
pub mod session;

pub use extract::{RequireAdmin, SessionUser};
pub use session::{Session, SessionStore};

pub const SESSION_COOKIE: &str = "session";
pub const ROLE_COOKIE: &str = "role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full management access.
    Admin,
    /// Scanning only: look up, redeem and check in.
    Limited,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Limited => "limited",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
