//! Registration, login, sessions and Google sign-in.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{jwt, password};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::AuthProvider;
use crate::state::AppState;
use crate::web::extract::AuthedUser;

const BAD_CREDENTIALS: &str = "invalid email or password";
const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user cancelled or the request failed.
    pub error: Option<String>,
}

#[instrument(name = "handler::register", skip_all, fields(email = %body.email))]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let email = body.email.trim().to_lowercase();
    if !is_plausible_email(&email) {
        return Err(AppError::Validation("a valid email address is required".into()));
    }
    if body.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }

    let hash = password::hash_password(&body.password)?;
    let id = format!("email:{}", Uuid::new_v4());
    let user = match db::users::create_email_user(
        &state.pool,
        &id,
        &email,
        body.first_name.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        body.last_name.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        &hash,
    )
    .await
    {
        Ok(user) => user,
        Err(err) if AppError::is_unique_violation(&err) => {
            return Err(AppError::Conflict(
                "an account with this email already exists".into(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    info!(user = %user.id, "account registered");
    let token = jwt::sign(&user.id, user.email.as_deref(), &state.config.jwt_secret)?;
    Ok(HttpResponse::Created()
        .cookie(jwt::session_cookie(token))
        .json(user))
}

/// Wrong email and wrong password answer identically so the endpoint
/// cannot be used to probe which addresses have accounts.
#[instrument(name = "handler::login", skip_all, fields(email = %body.email))]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let user = db::users::find_by_email(&state.pool, body.email.trim())
        .await?
        .ok_or_else(|| AppError::Auth(BAD_CREDENTIALS.into()))?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::Auth(BAD_CREDENTIALS.into()))?;
    if !password::verify_password(&body.password, hash)? {
        warn!(user = %user.id, "login rejected");
        return Err(AppError::Auth(BAD_CREDENTIALS.into()));
    }

    info!(user = %user.id, "login succeeded");
    let token = jwt::sign(&user.id, user.email.as_deref(), &state.config.jwt_secret)?;
    Ok(HttpResponse::Ok().cookie(jwt::session_cookie(token)).json(user))
}

pub async fn logout() -> HttpResponse {
    HttpResponse::Ok()
        .cookie(jwt::clear_cookie())
        .json(serde_json::json!({ "message": "logged out" }))
}

#[instrument(name = "handler::current_user", skip_all, fields(user = %auth.id))]
pub async fn current_user(
    state: web::Data<AppState>,
    auth: AuthedUser,
) -> Result<HttpResponse> {
    let user = db::users::find_by_id(&state.pool, &auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("account no longer exists".into()))?;
    Ok(HttpResponse::Ok().json(user))
}

/// Start of the Google dance: mint a one-time state nonce and redirect.
#[instrument(name = "handler::google_start", skip_all)]
pub async fn google_start(state: web::Data<AppState>) -> Result<HttpResponse> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| AppError::Config("Google sign-in is not configured".into()))?;
    let nonce = state.nonces.issue();
    let url = oauth.authorize_url(&nonce);
    Ok(HttpResponse::Found()
        .insert_header(("Location", url))
        .finish())
}

#[instrument(name = "handler::google_callback", skip_all)]
pub async fn google_callback(
    state: web::Data<AppState>,
    query: web::Query<OAuthCallbackQuery>,
) -> Result<HttpResponse> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| AppError::Config("Google sign-in is not configured".into()))?;
    let query = query.into_inner();

    if let Some(error) = query.error {
        warn!(error = %error, "provider returned an error on callback");
        return Err(AppError::Auth("Google sign-in was cancelled or refused".into()));
    }
    let nonce = query
        .state
        .ok_or_else(|| AppError::Auth("missing OAuth state".into()))?;
    if !state.nonces.consume(&nonce) {
        warn!("unknown or expired OAuth state");
        return Err(AppError::Auth("OAuth state is invalid or expired".into()));
    }
    let code = query
        .code
        .ok_or_else(|| AppError::Auth("missing authorization code".into()))?;

    let access_token = oauth.exchange(code).await?;
    let profile = oauth.fetch_profile(&access_token).await?;

    let id = format!("google:{}", profile.sub);
    let user = db::users::upsert_oauth_user(
        &state.pool,
        &id,
        AuthProvider::Google,
        profile.email.as_deref(),
        profile.given_name.as_deref(),
        profile.family_name.as_deref(),
        profile.email_verified,
    )
    .await?;

    info!(user = %user.id, "google sign-in completed");
    let token = jwt::sign(&user.id, user.email.as_deref(), &state.config.jwt_secret)?;
    Ok(HttpResponse::Found()
        .cookie(jwt::session_cookie(token))
        .insert_header(("Location", state.config.app_base_url.clone()))
        .finish())
}

/// Good enough to catch typos; real verification is delivery.
pub(crate) fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
