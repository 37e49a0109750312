//! Profile, password, settings and account-deletion handlers.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::auth::{jwt, password};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{AuthProvider, SettingsPatch};
use crate::state::AppState;
use crate::web::extract::AuthedUser;
use crate::web::handlers::auth::is_plausible_email;
use crate::web::handlers::require_user;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[instrument(name = "handler::update_profile", skip_all, fields(user = %auth.id))]
pub async fn update_profile(
    state: web::Data<AppState>,
    auth: AuthedUser,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let email = match body.email.as_deref().map(str::trim) {
        Some(e) if !e.is_empty() => {
            if !is_plausible_email(e) {
                return Err(AppError::Validation("a valid email address is required".into()));
            }
            Some(e.to_lowercase())
        }
        _ => None,
    };

    let updated = db::users::update_profile(
        &state.pool,
        &auth.id,
        body.first_name.as_deref().map(str::trim),
        body.last_name.as_deref().map(str::trim),
        email.as_deref(),
    )
    .await;

    let user = match updated {
        Ok(Some(user)) => user,
        Ok(None) => return Err(AppError::NotFound("account no longer exists".into())),
        Err(err) if AppError::is_unique_violation(&err) => {
            return Err(AppError::Conflict(
                "an account with this email already exists".into(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    info!(user = %user.id, "profile updated");
    // Re-issue the session so the email claim tracks the profile.
    let token = jwt::sign(&user.id, user.email.as_deref(), &state.config.jwt_secret)?;
    Ok(HttpResponse::Ok().cookie(jwt::session_cookie(token)).json(user))
}

#[instrument(name = "handler::change_password", skip_all, fields(user = %auth.id))]
pub async fn change_password(
    state: web::Data<AppState>,
    auth: AuthedUser,
    body: web::Json<PasswordChange>,
) -> Result<HttpResponse> {
    let user = require_user(&state, &auth.id).await?;
    if user.auth_provider != AuthProvider::Email {
        return Err(AppError::Validation(
            "password can only be changed on email accounts".into(),
        ));
    }
    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::Internal("email account without password hash".into()))?;
    if !password::verify_password(&body.current_password, hash)? {
        warn!(user = %user.id, "password change rejected");
        return Err(AppError::Auth("current password is incorrect".into()));
    }
    if body.new_password.chars().count() < 8 {
        return Err(AppError::Validation("password must be at least 8 characters".into()));
    }

    let new_hash = password::hash_password(&body.new_password)?;
    db::users::set_password_hash(&state.pool, &user.id, &new_hash).await?;
    info!(user = %user.id, "password changed");
    Ok(HttpResponse::Ok().json(json!({ "message": "password updated" })))
}

#[instrument(name = "handler::get_settings", skip_all, fields(user = %auth.id))]
pub async fn get_settings(
    state: web::Data<AppState>,
    auth: AuthedUser,
) -> Result<HttpResponse> {
    // The lazy insert references users(id); a stale token must 404, not 500.
    require_user(&state, &auth.id).await?;
    let settings = db::settings::get_or_create(&state.pool, &auth.id).await?;
    Ok(HttpResponse::Ok().json(settings))
}

#[instrument(name = "handler::update_settings", skip_all, fields(user = %auth.id))]
pub async fn update_settings(
    state: web::Data<AppState>,
    auth: AuthedUser,
    body: web::Json<SettingsPatch>,
) -> Result<HttpResponse> {
    require_user(&state, &auth.id).await?;
    db::settings::get_or_create(&state.pool, &auth.id).await?;
    let settings = db::settings::update(&state.pool, &auth.id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound("account no longer exists".into()))?;
    info!(user = %auth.id, "settings updated");
    Ok(HttpResponse::Ok().json(settings))
}

#[instrument(name = "handler::delete_account", skip_all, fields(user = %auth.id))]
pub async fn delete_account(
    state: web::Data<AppState>,
    auth: AuthedUser,
) -> Result<HttpResponse> {
    if !db::users::delete(&state.pool, &auth.id).await? {
        return Err(AppError::NotFound("account no longer exists".into()));
    }
    info!(user = %auth.id, "account deleted");
    Ok(HttpResponse::Ok()
        .cookie(jwt::clear_cookie())
        .json(json!({ "message": "account deleted" })))
}
