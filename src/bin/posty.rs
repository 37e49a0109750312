//! Posty server binary.
//!
//! A thin shim over the library crate: load configuration, open the pool,
//! apply migrations, serve.

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use clap::Parser;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use posty::{db, AppConfig, AppState};

#[derive(Parser, Debug)]
#[command(
    name = "posty",
    version,
    about = "Scanned-mail ingestion server",
    long_about = "Backend for a scanned-postal-mail organiser. Accepts uploads, reads them \
with a vision language model (or a deterministic filename fallback), stores per-user \
records in Postgres and sends best-effort email notifications.\n\n\
Configuration comes from the environment (or a .env file): DATABASE_URL and JWT_SECRET \
are required; OPENAI_API_KEY, SMTP_* and GOOGLE_CLIENT_* unlock the optional subsystems."
)]
struct Cli {
    /// Bind address; overrides SERVER_HOST.
    #[arg(long)]
    host: Option<String>,

    /// Listen port; overrides SERVER_PORT.
    #[arg(short, long)]
    port: Option<u16>,

    /// Apply pending migrations and exit without serving.
    #[arg(long)]
    migrate_only: bool,

    /// Debug-level logging (RUST_LOG still wins when set).
    #[arg(short, long)]
    verbose: bool,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug,sqlx=info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = AppConfig::from_env().context("loading configuration")?;
    if let Some(host) = cli.host {
        config.server_host = host;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    let pool = db::connect(&config.database_url)
        .await
        .context("connecting to Postgres")?;
    db::MIGRATOR
        .run(&pool)
        .await
        .context("applying migrations")?;
    if cli.migrate_only {
        tracing::info!("migrations applied, exiting");
        return Ok(());
    }

    let bind_addr = (config.server_host.clone(), config.server_port);
    let state = AppState::build(config, pool)?;
    tracing::info!(host = %bind_addr.0, port = bind_addr.1, "starting server");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(TracingLogger::default())
            .configure(posty::web::routes::configure)
    })
    .bind(bind_addr)
    .context("binding listen address")?
    .run()
    .await
    .context("server terminated")
}
