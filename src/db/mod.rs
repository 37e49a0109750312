//! Persistence layer: thin async CRUD over a `PgPool`.
//!
//! Every mail-item query takes a `user_id` and carries it in the WHERE
//! clause. That conjunct is the only access-control mechanism in the
//! system, so no function in this module accepts an item id without one.
//! Cross-user cleanup (items, labels, settings on account deletion) is the
//! storage engine's job via `ON DELETE CASCADE`, not application code.

pub mod mail_items;
pub mod settings;
pub mod users;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Embedded migrations; run at startup and by the gated integration tests.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Open the connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}
