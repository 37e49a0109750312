//! Request handlers, grouped by surface area.

pub mod account;
pub mod auth;
pub mod email;
pub mod mail_items;

use actix_web::HttpResponse;

use crate::db;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::state::AppState;

/// Liveness probe.
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Load the authenticated user's row. A still-valid token for a deleted
/// account answers 404 instead of surfacing downstream FK errors.
pub(crate) async fn require_user(state: &AppState, id: &str) -> Result<User> {
    db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("account no longer exists".into()))
}
