use actix_web::{get, post, put, web, HttpResponse};
use validator::Validate;

use crate::auth::{AuthService, AuthenticatedUser};
use crate::errors::ApiError;
use crate::models::dto::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest};

#[post("/login")]
pub async fn login(
    auth: web::Data<AuthService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    request.validate()?;
    let response = web::block(move || auth.login(&request)).await??;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/register")]
pub async fn register(
    auth: web::Data<AuthService>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    request.validate()?;
    let response = web::block(move || auth.register(&request)).await??;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/me")]
pub async fn me(
    user: AuthenticatedUser,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ApiError> {
    let profile = web::block(move || auth.profile(&user.user_id)).await??;
    Ok(HttpResponse::Ok().json(profile))
}

#[put("/profile")]
pub async fn update_profile(
    user: AuthenticatedUser,
    auth: web::Data<AuthService>,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    request.validate()?;
    web::block(move || auth.update_profile(&user.user_id, &request)).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/change-password")]
pub async fn change_password(
    user: AuthenticatedUser,
    auth: web::Data<AuthService>,
    request: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    request.validate()?;
    web::block(move || auth.change_password(&user.user_id, &request)).await??;
    Ok(HttpResponse::NoContent().finish())
}
