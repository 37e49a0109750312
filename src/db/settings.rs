//! User-settings repository.

use sqlx::PgPool;

use crate::models::{SettingsPatch, UserSettings};

/// Fetch the settings row, creating it with the column defaults on first
/// read. One statement, race-free: concurrent first reads both land on the
/// same row.
pub async fn get_or_create(pool: &PgPool, user_id: &str) -> Result<UserSettings, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(
        "INSERT INTO user_settings (user_id) VALUES ($1)
         ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
         RETURNING *",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Merge-update. Scalar `None`s keep stored values; the SMTP group is
/// written (or cleared) as a unit only when the patch carries it.
pub async fn update(
    pool: &PgPool,
    user_id: &str,
    patch: &SettingsPatch,
) -> Result<Option<UserSettings>, sqlx::Error> {
    let smtp = patch.smtp.clone().flatten();
    sqlx::query_as::<_, UserSettings>(
        "UPDATE user_settings SET
             theme = COALESCE($2, theme),
             language = COALESCE($3, language),
             timezone = COALESCE($4, timezone),
             notify_on_upload = COALESCE($5, notify_on_upload),
             notify_reminders = COALESCE($6, notify_reminders),
             auto_delete = COALESCE($7, auto_delete),
             smtp_host = CASE WHEN $8 THEN $9 ELSE smtp_host END,
             smtp_port = CASE WHEN $8 THEN $10 ELSE smtp_port END,
             smtp_secure = CASE WHEN $8 THEN $11 ELSE smtp_secure END,
             smtp_username = CASE WHEN $8 THEN $12 ELSE smtp_username END,
             smtp_password = CASE WHEN $8 THEN $13 ELSE smtp_password END,
             smtp_from = CASE WHEN $8 THEN $14 ELSE smtp_from END,
             updated_at = now()
         WHERE user_id = $1
         RETURNING *",
    )
    .bind(user_id)
    .bind(patch.theme.as_deref())
    .bind(patch.language.as_deref())
    .bind(patch.timezone.as_deref())
    .bind(patch.notify_on_upload)
    .bind(patch.notify_reminders)
    .bind(patch.auto_delete.as_deref())
    .bind(patch.smtp.is_some())
    .bind(smtp.as_ref().map(|o| o.host.clone()))
    .bind(smtp.as_ref().and_then(|o| o.port))
    .bind(smtp.as_ref().and_then(|o| o.secure))
    .bind(smtp.as_ref().and_then(|o| o.username.clone()))
    .bind(smtp.as_ref().and_then(|o| o.password.clone()))
    .bind(smtp.as_ref().and_then(|o| o.from.clone()))
    .fetch_optional(pool)
    .await
}
