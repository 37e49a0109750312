//! Application error taxonomy and its HTTP mapping.
//!
//! One enum covers the whole request path. Client-caused failures (4xx)
//! carry their message through to the response body unchanged; server-side
//! failures (5xx) respond with a generic body and log the detail, so
//! internals never leak to clients.
//!
//! Analysis and notification failures are deliberately *absent* here: both
//! subsystems degrade instead of erroring (see [`crate::analyzer`] and
//! [`crate::notify`]), so an upload request only fails for intake,
//! database or auth reasons.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    // ── Client errors: message goes to the wire as-is ─────────────────────
    /// Malformed or unacceptable request input (bad file type, bad field).
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Auth(String),

    /// The addressed resource does not exist, or belongs to someone else.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule was violated (duplicate registration email).
    #[error("{0}")]
    Conflict(String),

    /// Upload exceeded the size cap.
    #[error("{0}")]
    PayloadTooLarge(String),

    // ── Server errors: logged in full, generic on the wire ────────────────
    /// Startup or environment misconfiguration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Any database failure.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Everything else.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Auth(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => "internal_error",
        }
    }

    /// True when a sqlx error is a unique-constraint violation. Lets
    /// handlers turn insert races into 409s instead of 500s.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(
            err,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("i/o error: {err}"))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "responding with server error");
            return HttpResponse::build(status).json(json!({
                "error": self.code(),
                "message": "an internal error occurred",
            }));
        }
        tracing::debug!(error = %self, "responding with client error");
        HttpResponse::build(status).json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}

/// Application-wide result alias.
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_contract() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Auth("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::PayloadTooLarge("x".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn client_errors_keep_their_message() {
        let msg = AppError::Validation("file type not allowed".into()).to_string();
        assert!(msg.contains("file type not allowed"), "got: {msg}");
    }

    #[test]
    fn config_display_names_the_source() {
        let msg = AppError::Config("JWT_SECRET is not set".into()).to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("JWT_SECRET"));
    }
}
