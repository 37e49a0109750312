//! User repository.

use sqlx::PgPool;

use crate::models::{AuthProvider, User};

/// Insert a password-based account. The caller supplies the generated
/// `email:<uuid>` id and the argon2 hash; emails are stored lowercased.
pub async fn create_email_user(
    pool: &PgPool,
    id: &str,
    email: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, first_name, last_name, auth_provider, password_hash)
         VALUES ($1, lower($2), $3, $4, 'email', $5)
         RETURNING *",
    )
    .bind(id)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

/// Insert or refresh an OAuth account. Fields the provider did not send
/// keep their stored values.
pub async fn upsert_oauth_user(
    pool: &PgPool,
    id: &str,
    provider: AuthProvider,
    email: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email_verified: bool,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, first_name, last_name, auth_provider, password_hash, email_verified)
         VALUES ($1, lower($2), $3, $4, $5, NULL, $6)
         ON CONFLICT (id) DO UPDATE SET
             email = COALESCE(EXCLUDED.email, users.email),
             first_name = COALESCE(EXCLUDED.first_name, users.first_name),
             last_name = COALESCE(EXCLUDED.last_name, users.last_name),
             email_verified = EXCLUDED.email_verified,
             updated_at = now()
         RETURNING *",
    )
    .bind(id)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(provider.as_str())
    .bind(email_verified)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = lower($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Merge-update of the profile; `None` keeps the stored value. Changing
/// the email drops its verified flag until re-proven.
pub async fn update_profile(
    pool: &PgPool,
    id: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET
             first_name = COALESCE($2, first_name),
             last_name = COALESCE($3, last_name),
             email_verified = CASE
                 WHEN $4 IS NOT NULL AND lower($4) IS DISTINCT FROM email THEN FALSE
                 ELSE email_verified
             END,
             email = COALESCE(lower($4), email),
             updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn set_password_hash(pool: &PgPool, id: &str, hash: &str) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(hash)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Delete an account; items, labels and settings go with it via cascade.
pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}
