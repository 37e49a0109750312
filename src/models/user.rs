//! User accounts.
//!
//! The primary key is an opaque provider-qualified string (`email:<uuid>` for
//! password accounts, `google:<subject>` for OAuth accounts) so identifiers
//! from different providers can never collide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Email,
    Google,
    Apple,
}

impl AuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthProvider::Email => "email",
            AuthProvider::Google => "google",
            AuthProvider::Apple => "apple",
        }
    }

    pub fn parse(s: &str) -> Option<AuthProvider> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Some(AuthProvider::Email),
            "google" => Some(AuthProvider::Google),
            "apple" => Some(AuthProvider::Apple),
            _ => None,
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown auth provider {0:?}")]
pub struct UnknownProvider(pub String);

impl TryFrom<String> for AuthProvider {
    type Error = UnknownProvider;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        AuthProvider::parse(&s).ok_or(UnknownProvider(s))
    }
}

/// A user row.
///
/// `password_hash` never leaves the server; it is skipped on serialization
/// and is `None` for OAuth accounts (enforced by a table CHECK).
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub auth_provider: AuthProvider,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name for email greetings: first name, full name, or the
    /// mailbox local part, in that order of preference.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), _) if !first.trim().is_empty() => first.trim().to_string(),
            (None, Some(last)) if !last.trim().is_empty() => last.trim().to_string(),
            _ => self
                .email
                .as_deref()
                .and_then(|e| e.split('@').next())
                .unwrap_or("there")
                .to_string(),
        }
    }
}
