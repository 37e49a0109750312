//! Mail-item handlers: the upload pipeline plus CRUD and file serving.

use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::MultipartForm;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::db::{self, mail_items::ListFilter};
use crate::error::{AppError, Result};
use crate::intake;
use crate::models::{Category, MailItem, MailItemPatch, NewMailItem};
use crate::state::AppState;
use crate::web::extract::AuthedUser;

#[derive(Debug, MultipartForm)]
pub struct UploadForm {
    #[multipart(rename = "file")]
    pub file: TempFile,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<i64>,
}

/// The ingestion pipeline: store, analyse, persist, notify, respond.
/// Analysis and notification cannot fail the request; only intake,
/// database and auth errors do.
#[instrument(name = "handler::upload", skip_all, fields(user = %auth.id))]
pub async fn upload(
    state: web::Data<AppState>,
    auth: AuthedUser,
    MultipartForm(form): MultipartForm<UploadForm>,
) -> Result<HttpResponse> {
    let stored = intake::store(&state.config.upload_dir, form.file).await?;
    let analysis = state
        .analyzer
        .analyze(&stored.path, &stored.original_name)
        .await;

    let r = analysis.result;
    let item = db::mail_items::create(
        &state.pool,
        &auth.id,
        NewMailItem {
            title: r.title,
            summary: r.summary,
            category: r.category,
            categories: r.categories,
            custom_categories: r.custom_categories,
            reminder_date: r.reminder_date,
            image_url: stored.image_url(),
            file_name: stored.original_name,
            extracted_text: r.extracted_text,
        },
    )
    .await?;

    info!(item = item.id, status = ?analysis.status, "mail item created");
    send_upload_notification(&state, &auth.id, &item).await;
    Ok(HttpResponse::Created().json(item))
}

/// Best-effort; every failure is logged here or inside the notifier and
/// the upload response is never affected.
async fn send_upload_notification(state: &AppState, user_id: &str, item: &MailItem) {
    let user = match db::users::find_by_id(&state.pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(err) => {
            warn!(error = %err, "could not load user for upload notification");
            return;
        }
    };
    let settings = match db::settings::get_or_create(&state.pool, user_id).await {
        Ok(settings) => settings,
        Err(err) => {
            warn!(error = %err, "could not load settings for upload notification");
            return;
        }
    };
    state.notifier.notify(&user, &settings, item).await;
}

#[instrument(name = "handler::list_items", skip_all, fields(user = %auth.id))]
pub async fn list(
    state: web::Data<AppState>,
    auth: AuthedUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let category = match query.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            Category::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("unknown category {raw:?}")))?,
        ),
        None => None,
    };
    let filter = ListFilter { category, search: query.search.clone() };
    let items = db::mail_items::list(&state.pool, &auth.id, &filter).await?;
    Ok(HttpResponse::Ok().json(items))
}

#[instrument(name = "handler::get_item", skip_all, fields(user = %auth.id, item = %path))]
pub async fn get(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let item = db::mail_items::get(&state.pool, &auth.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("mail item {id} not found")))?;
    Ok(HttpResponse::Ok().json(item))
}

#[instrument(name = "handler::update_item", skip_all, fields(user = %auth.id, item = %path))]
pub async fn update(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<i64>,
    body: web::Json<MailItemPatch>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let item = db::mail_items::update(&state.pool, &auth.id, id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("mail item {id} not found")))?;
    Ok(HttpResponse::Ok().json(item))
}

#[instrument(name = "handler::delete_item", skip_all, fields(user = %auth.id, item = %path))]
pub async fn remove(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    if !db::mail_items::delete(&state.pool, &auth.id, id).await? {
        return Err(AppError::NotFound(format!("mail item {id} not found")));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "mail item deleted" })))
}

#[instrument(name = "handler::bulk_delete", skip_all, fields(user = %auth.id))]
pub async fn bulk_delete(
    state: web::Data<AppState>,
    auth: AuthedUser,
    body: web::Json<BulkDeleteRequest>,
) -> Result<HttpResponse> {
    let deleted = db::mail_items::delete_many(&state.pool, &auth.id, &body.ids).await?;
    info!(requested = body.ids.len(), deleted, "bulk delete finished");
    Ok(HttpResponse::Ok().json(json!({ "deleted": deleted })))
}

/// Serve a stored upload. Ownership is resolved by looking the path up
/// among the caller's own items, so unmatched or foreign names are an
/// indistinguishable 404.
#[instrument(name = "handler::serve_upload", skip_all, fields(user = %auth.id))]
pub async fn serve_upload(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let stored_name = path.into_inner();
    let image_url = format!("/uploads/{stored_name}");
    let item = db::mail_items::find_by_image_url(&state.pool, &auth.id, &image_url)
        .await?
        .ok_or_else(|| AppError::NotFound("no such upload".into()))?;

    let bytes = tokio::fs::read(state.config.upload_dir.join(&stored_name))
        .await
        .map_err(|err| {
            warn!(error = %err, stored = %stored_name, "stored file missing for owned item");
            AppError::NotFound("the stored file is no longer available".into())
        })?;

    let extension = intake::extension_of(&stored_name).unwrap_or_default();
    let display_name = item.file_name.replace(['"', '\r', '\n'], "_");
    Ok(HttpResponse::Ok()
        .content_type(intake::mime_for_extension(&extension))
        .append_header(("Content-Disposition", format!("inline; filename=\"{display_name}\"")))
        .body(bytes))
}
