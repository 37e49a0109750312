//! Email diagnostics: inspect the resolved transport, fire a test message.

use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use crate::db;
use crate::error::Result;
use crate::notify::{NotifyOutcome, TransportInfo};
use crate::state::AppState;
use crate::web::extract::AuthedUser;
use crate::web::handlers::require_user;

#[derive(Debug, Serialize)]
struct TestConfigResponse {
    configured: bool,
    #[serde(flatten)]
    transport: Option<TransportInfo>,
}

#[instrument(name = "handler::email_test_config", skip_all, fields(user = %auth.id))]
pub async fn test_config(
    state: web::Data<AppState>,
    auth: AuthedUser,
) -> Result<HttpResponse> {
    require_user(&state, &auth.id).await?;
    let settings = db::settings::get_or_create(&state.pool, &auth.id).await?;
    let transport = state.notifier.transport_info(&settings);
    Ok(HttpResponse::Ok().json(TestConfigResponse {
        configured: transport.is_some(),
        transport,
    }))
}

/// Delivery problems are the whole point of this endpoint, so a failed
/// send is a 200 with `sent: false` and the reason, not an error status.
#[instrument(name = "handler::email_test_send", skip_all, fields(user = %auth.id))]
pub async fn test_send(
    state: web::Data<AppState>,
    auth: AuthedUser,
) -> Result<HttpResponse> {
    let user = require_user(&state, &auth.id).await?;
    let settings = db::settings::get_or_create(&state.pool, &auth.id).await?;
    let body = match state.notifier.send_test(&user, &settings).await {
        NotifyOutcome::Sent => json!({ "sent": true }),
        NotifyOutcome::Skipped(reason) => json!({ "sent": false, "reason": reason.as_str() }),
    };
    Ok(HttpResponse::Ok().json(body))
}
