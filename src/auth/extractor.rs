use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};

use crate::auth::TokenIssuer;
use crate::errors::ApiError;

/// The caller behind a valid `Authorization: Bearer` token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, ApiError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ApiError::Internal("token issuer is not registered".to_string()))?;
    let token = bearer_token(req)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
    let claims = issuer.verify(token).map_err(|err| {
        tracing::warn!(error = %err, path = req.path(), "rejected bearer token");
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?;
    Ok(AuthenticatedUser {
        user_id: claims.sub,
        email: claims.email,
    })
}
