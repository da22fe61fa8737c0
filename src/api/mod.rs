use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, PasswordHasher, TokenIssuer};
use crate::config::Config;
use crate::errors::ApiError;
use crate::repository::Database;

pub mod auth;
pub mod todos;

/// Shared handles registered as `web::Data` on every worker.
#[derive(Clone)]
pub struct AppState {
    pub db: web::Data<Database>,
    pub auth: web::Data<AuthService>,
    pub tokens: web::Data<TokenIssuer>,
}

impl AppState {
    pub fn new(db: Database, hasher: PasswordHasher, config: &Config) -> Self {
        let tokens = TokenIssuer::new(
            config.jwt_key.as_bytes(),
            &config.jwt_issuer,
            &config.jwt_audience,
            config.jwt_ttl,
        );
        let auth = AuthService::new(db.clone(), hasher, tokens.clone());
        Self {
            db: web::Data::new(db),
            auth: web::Data::new(auth),
            tokens: web::Data::new(tokens),
        }
    }

    /// Registers the shared data, extractor error handlers and every route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.db.clone())
            .app_data(self.auth.clone())
            .app_data(self.tokens.clone());
        config(cfg);
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub version: String,
}

#[get("/health")]
async fn healthcheck() -> impl Responder {
    HttpResponse::Ok().json(Health {
        status: "Healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    tracing::warn!(path = req.path(), method = %req.method(), "no route matched");
    Err(ApiError::NotFound("Resource not found".to_string()))
}

fn bad_request(err: impl std::fmt::Display) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| bad_request(err)))
        .app_data(web::QueryConfig::default().error_handler(|err, _| bad_request(err)))
        .app_data(web::PathConfig::default().error_handler(|err, _| bad_request(err)))
        .service(healthcheck)
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .service(auth::login)
                        .service(auth::register)
                        .service(auth::me)
                        .service(auth::update_profile)
                        .service(auth::change_password),
                )
                // `stats` must be registered ahead of `/todos/{id}`.
                .service(todos::todo_stats)
                .service(todos::list_todos)
                .service(todos::create_todo)
                .service(todos::get_todo)
                .service(todos::update_todo)
                .service(todos::toggle_todo)
                .service(todos::delete_todo)
                .service(todos::archive_todo)
                .service(todos::restore_todo),
        );
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::password::fast_hasher;
    use actix_web::http::header;
    use actix_web::test::TestRequest;
    use serde_json::json;

    pub fn state() -> AppState {
        let config = Config::for_database_url(":memory:".into(), "test-signing-key".into());
        AppState::new(Database::in_memory().unwrap(), fast_hasher(), &config)
    }

    /// Initializes the full application around an [`AppState`].
    macro_rules! test_app {
        ($state:expr) => {{
            let state = $state.clone();
            actix_web::test::init_service(
                actix_web::App::new()
                    .configure(move |cfg| state.configure(cfg))
                    .default_service(actix_web::web::route().to($crate::api::not_found)),
            )
            .await
        }};
    }
    pub(crate) use test_app;

    pub fn register_request(email: &str) -> TestRequest {
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "email": email,
            "password": "Secret1",
            "firstName": "Test",
            "lastName": "User",
        }))
    }

    pub fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }
}
