//! Process configuration, loaded once at startup from the environment.
//!
//! Three subsystems are optional and degrade gracefully when absent: the
//! vision API (uploads fall back to filename classification), SMTP
//! (notifications are skipped) and Google OAuth (the routes answer but
//! refuse). A *half*-configured group is a startup error instead, because a
//! typo'd variable should fail loudly rather than silently disable email.

use std::env;
use std::fmt;
use std::path::PathBuf;

use dotenvy::dotenv;

use crate::error::{AppError, Result};

/// Default chat-completions endpoint when `OPENAI_BASE_URL` is not set.
pub const DEFAULT_VISION_BASE_URL: &str = "https://api.openai.com/v1";
/// Default vision-capable model when `POSTY_VISION_MODEL` is not set.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";

#[derive(Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    /// Public base URL of the app, used for OAuth redirects back to the UI.
    pub app_base_url: String,
    /// Directory where uploaded files are stored under generated names.
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    pub vision: Option<VisionApiConfig>,
    pub smtp: Option<SmtpServerConfig>,
    pub google_oauth: Option<OAuthProviderConfig>,
}

/// OpenAI-compatible vision endpoint.
#[derive(Clone)]
pub struct VisionApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Process-wide SMTP defaults; per-user settings can override them.
#[derive(Clone)]
pub struct SmtpServerConfig {
    pub host: String,
    pub port: u16,
    /// True = implicit TLS (SMTPS, usually 465); false = STARTTLS upgrade.
    pub secure: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: Option<String>,
    pub from_address: String,
}

/// Google OAuth client registration.
#[derive(Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let require = |name: &str| -> Result<String> {
            env::var(name).map_err(|_| {
                AppError::Config(format!("missing required environment variable {name}"))
            })
        };
        let optional = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        let server_host = optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port = optional("SERVER_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("invalid SERVER_PORT: {e}")))?;
        let database_url = require("DATABASE_URL")?;
        let app_base_url = optional("APP_BASE_URL")
            .unwrap_or_else(|| format!("http://{server_host}:{server_port}"));
        let upload_dir =
            PathBuf::from(optional("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()));
        let jwt_secret = require("JWT_SECRET")?;
        if jwt_secret.len() < 16 {
            return Err(AppError::Config(
                "JWT_SECRET must be at least 16 characters".to_string(),
            ));
        }

        let vision = optional("OPENAI_API_KEY").map(|api_key| VisionApiConfig {
            api_key,
            base_url: optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_VISION_BASE_URL.to_string()),
            model: optional("POSTY_VISION_MODEL")
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
        });

        let smtp = match optional("SMTP_HOST") {
            None => None,
            Some(host) => {
                let from_address = require("SMTP_FROM_ADDRESS").map_err(|_| {
                    AppError::Config(
                        "SMTP_HOST is set but SMTP_FROM_ADDRESS is missing".to_string(),
                    )
                })?;
                Some(SmtpServerConfig {
                    host,
                    port: optional("SMTP_PORT")
                        .unwrap_or_else(|| "587".to_string())
                        .parse::<u16>()
                        .map_err(|e| AppError::Config(format!("invalid SMTP_PORT: {e}")))?,
                    secure: optional("SMTP_SECURE").map(|v| parse_bool(&v)).unwrap_or(false),
                    username: optional("SMTP_USERNAME"),
                    password: optional("SMTP_PASSWORD"),
                    from_name: optional("SMTP_FROM_NAME"),
                    from_address,
                })
            }
        };

        let google_oauth = match optional("GOOGLE_CLIENT_ID") {
            None => None,
            Some(client_id) => Some(OAuthProviderConfig {
                client_id,
                client_secret: require("GOOGLE_CLIENT_SECRET").map_err(|_| {
                    AppError::Config(
                        "GOOGLE_CLIENT_ID is set but GOOGLE_CLIENT_SECRET is missing".to_string(),
                    )
                })?,
                redirect_url: optional("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|| format!("{app_base_url}/api/auth/google/callback")),
            }),
        };

        tracing::info!(
            vision = vision.is_some(),
            smtp = smtp.is_some(),
            google_oauth = google_oauth.is_some(),
            upload_dir = %upload_dir.display(),
            "configuration loaded"
        );

        Ok(Self {
            server_host,
            server_port,
            database_url,
            app_base_url,
            upload_dir,
            jwt_secret,
            vision,
            smtp,
            google_oauth,
        })
    }
}

/// Lenient boolean parse for env flags: `1`, `true`, `yes`, `on` (any case).
fn parse_bool(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// Secrets stay out of debug output; config is logged at startup.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("database_url", &"<redacted>")
            .field("app_base_url", &self.app_base_url)
            .field("upload_dir", &self.upload_dir)
            .field("jwt_secret", &"<redacted>")
            .field("vision", &self.vision)
            .field("smtp", &self.smtp)
            .field("google_oauth", &self.google_oauth)
            .finish()
    }
}

impl fmt::Debug for VisionApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionApiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl fmt::Debug for SmtpServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from_name", &self.from_name)
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl fmt::Debug for OAuthProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}
