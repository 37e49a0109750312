//! Shared application state handed to every worker.

use std::sync::Arc;

use sqlx::PgPool;

use crate::analyzer::Analyzer;
use crate::auth::{GoogleOAuth, MemoryNonceStore, NonceStore};
use crate::config::AppConfig;
use crate::error::Result;
use crate::notify::Notifier;

/// Everything a handler needs; cloning is a handful of `Arc` bumps.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub analyzer: Arc<Analyzer>,
    pub notifier: Arc<Notifier>,
    pub nonces: Arc<dyn NonceStore>,
    /// `None` when Google sign-in is not configured.
    pub oauth: Option<Arc<GoogleOAuth>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Production wiring from configuration plus an established pool.
    pub fn build(config: AppConfig, pool: PgPool) -> Result<Self> {
        let oauth = match &config.google_oauth {
            Some(cfg) => Some(Arc::new(GoogleOAuth::new(cfg)?)),
            None => None,
        };
        Ok(Self {
            analyzer: Arc::new(Analyzer::from_config(&config)),
            notifier: Arc::new(Notifier::from_config(&config)),
            nonces: Arc::new(MemoryNonceStore::new()),
            oauth,
            config: Arc::new(config),
            pool,
        })
    }
}
