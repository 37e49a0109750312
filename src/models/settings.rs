//! Per-user settings, including the optional per-user SMTP override.
//!
//! A settings row is created lazily on first read with the column defaults
//! from the migration, so every user observably "has" settings without a
//! write at registration time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::mail_item::double_option;

/// The settings row for one user.
///
/// `smtp_password` is write-only: accepted in updates, never serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: String,
    pub theme: String,
    pub language: String,
    pub timezone: String,
    pub notify_on_upload: bool,
    pub notify_reminders: bool,
    /// Retention preference (`never`, `30d`, ...). Stored verbatim; nothing
    /// in the backend acts on it yet.
    pub auto_delete: String,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_secure: Option<bool>,
    pub smtp_username: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    /// The per-user SMTP override, if one is configured. A host is the
    /// minimum; everything else falls back to sensible defaults downstream.
    pub fn smtp_override(&self) -> Option<SmtpOverride> {
        let host = self.smtp_host.clone()?;
        Some(SmtpOverride {
            host,
            port: self.smtp_port,
            secure: self.smtp_secure,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            from: self.smtp_from.clone(),
        })
    }
}

/// A user-supplied SMTP relay. Used both as the wire shape inside
/// [`SettingsPatch`] and as the resolved override handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpOverride {
    pub host: String,
    pub port: Option<i32>,
    pub secure: Option<bool>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub from: Option<String>,
}

/// Partial settings update. Scalars follow absent-keeps semantics; the
/// `smtp` group is tri-state as a unit: absent keeps the stored override,
/// `null` removes it, an object replaces it wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub theme: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub notify_on_upload: Option<bool>,
    pub notify_reminders: Option<bool>,
    pub auto_delete: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub smtp: Option<Option<SmtpOverride>>,
}
