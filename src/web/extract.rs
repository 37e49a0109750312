//! Request authentication extractor.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};

use crate::auth::jwt;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// The verified session behind a request. Handlers taking this parameter
/// are authenticated; everything else in them can assume a valid user id.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: Option<String>,
}

impl FromRequest for AuthedUser {
    type Error = AppError;
    type Future = Ready<Result<Self>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthedUser> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state missing".into()))?;
    let token =
        token_from(req).ok_or_else(|| AppError::Auth("authentication required".into()))?;
    let claims = jwt::verify(&token, &state.config.jwt_secret)?;
    Ok(AuthedUser { id: claims.sub, email: claims.email })
}

/// Session cookie first, `Authorization: Bearer` as the API alternative.
fn token_from(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(jwt::SESSION_COOKIE) {
        return Some(cookie.value().to_owned());
    }
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use actix_web::test::TestRequest;

    async fn extract(req: HttpRequest) -> Result<AuthedUser> {
        AuthedUser::from_request(&req, &mut Payload::None).await
    }

    fn request() -> TestRequest {
        TestRequest::default().app_data(web::Data::new(test_state()))
    }

    #[actix_web::test]
    async fn missing_credentials_are_rejected() {
        let req = request().to_http_request();
        assert!(matches!(extract(req).await, Err(AppError::Auth(_))));
    }

    #[actix_web::test]
    async fn cookie_session_is_accepted() {
        let state = test_state();
        let token = jwt::sign("email:u1", Some("a@example.com"), &state.config.jwt_secret).unwrap();
        let req = request()
            .cookie(jwt::session_cookie(token))
            .to_http_request();
        let user = extract(req).await.unwrap();
        assert_eq!(user.id, "email:u1");
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
    }

    #[actix_web::test]
    async fn bearer_header_is_accepted() {
        let state = test_state();
        let token = jwt::sign("google:42", None, &state.config.jwt_secret).unwrap();
        let req = request()
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();
        let user = extract(req).await.unwrap();
        assert_eq!(user.id, "google:42");
    }

    #[actix_web::test]
    async fn garbage_token_is_rejected() {
        let req = request()
            .insert_header((header::AUTHORIZATION, "Bearer not.a.jwt"))
            .to_http_request();
        assert!(matches!(extract(req).await, Err(AppError::Auth(_))));
    }
}
