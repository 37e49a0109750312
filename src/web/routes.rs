//! Route table.

use actix_web::web;

use crate::web::handlers;

/// Mounted in `main` and by the API tests; keeping the whole table in one
/// place means the tests exercise the same routing as production.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::auth::register))
                    .route("/login", web::post().to(handlers::auth::login))
                    .route("/logout", web::post().to(handlers::auth::logout))
                    .route("/user", web::get().to(handlers::auth::current_user))
                    .route("/google", web::get().to(handlers::auth::google_start))
                    .route("/google/callback", web::get().to(handlers::auth::google_callback)),
            )
            .route("/profile", web::put().to(handlers::account::update_profile))
            .route("/profile/password", web::put().to(handlers::account::change_password))
            .route("/settings", web::get().to(handlers::account::get_settings))
            .route("/settings", web::put().to(handlers::account::update_settings))
            .route("/account", web::delete().to(handlers::account::delete_account))
            .service(
                web::scope("/mail-items")
                    .route("", web::post().to(handlers::mail_items::upload))
                    .route("", web::get().to(handlers::mail_items::list))
                    // literal before `{id}`: registration order is match order
                    .route("/bulk-delete", web::post().to(handlers::mail_items::bulk_delete))
                    .route("/{id}", web::get().to(handlers::mail_items::get))
                    .route("/{id}", web::patch().to(handlers::mail_items::update))
                    .route("/{id}", web::delete().to(handlers::mail_items::remove)),
            )
            .service(
                web::scope("/email")
                    .route("/test-config", web::get().to(handlers::email::test_config))
                    .route("/test-send", web::post().to(handlers::email::test_send)),
            ),
    )
    .route("/uploads/{stored_name}", web::get().to(handlers::mail_items::serve_upload));
}
