use actix_web::{web, App, HttpServer};
use anyhow::Context;

use todo_service::api::{self, AppState};
use todo_service::auth::PasswordHasher;
use todo_service::config::Config;
use todo_service::repository::Database;
use todo_service::telemetry;

fn setup(config: &Config) -> anyhow::Result<AppState> {
    let db = Database::connect(&config.database_url, config.db_pool_size)
        .context("failed to open the database")?;
    db.run_migrations().context("failed to migrate the database")?;

    let state = AppState::new(db, PasswordHasher::new(), config);
    if let Some((email, password)) = &config.seed_admin {
        state
            .auth
            .seed_admin(email, password)
            .context("failed to seed the admin account")?;
    }
    Ok(state)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let app_name = option_env!("CARGO_BIN_NAME").unwrap_or("todo-service");
    telemetry::init(app_name)?;

    let config = Config::from_env()?;
    let state = setup(&config)?;
    tracing::info!(host = %config.host, port = config.port, "starting server");

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .configure(move |cfg| state.configure(cfg))
            .default_service(web::route().to(api::not_found))
            .wrap(actix_web::middleware::Logger::default())
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;
    Ok(())
}
