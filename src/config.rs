use std::str::FromStr;

use anyhow::{anyhow, Context};
use chrono::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_key: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_ttl: Duration,
    pub db_pool_size: u32,
    /// Email and password of the admin account created at startup, if any.
    pub seed_admin: Option<(String, String)>,
}

fn var_or(key: &str, default: &str) -> String {
    dotenvy::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenvy::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value `{raw}`")),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` when present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_key = dotenvy::var("JWT_KEY").context("JWT_KEY must be set")?;
        if jwt_key.trim().is_empty() {
            return Err(anyhow!("JWT_KEY must not be empty"));
        }
        let ttl_hours: i64 = parse_or("JWT_TTL_HOURS", 24)?;
        let seed_admin = match (
            dotenvy::var("SEED_ADMIN_EMAIL"),
            dotenvy::var("SEED_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            database_url: var_or("DATABASE_URL", "todos.db"),
            host: var_or("APP_HOST", "127.0.0.1"),
            port: parse_or("APP_PORT", 8080)?,
            jwt_key,
            jwt_issuer: var_or("JWT_ISSUER", "TodoApi"),
            jwt_audience: var_or("JWT_AUDIENCE", "TodoApp"),
            jwt_ttl: Duration::hours(ttl_hours),
            db_pool_size: parse_or("DB_POOL_SIZE", 8)?,
            seed_admin,
        })
    }

    pub fn for_database_url(database_url: String, jwt_key: String) -> Self {
        Self {
            database_url,
            host: "127.0.0.1".to_string(),
            port: 8080,
            jwt_key,
            jwt_issuer: "TodoApi".to_string(),
            jwt_audience: "TodoApp".to_string(),
            jwt_ttl: Duration::hours(24),
            db_pool_size: 1,
            seed_admin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_uses_defaults() {
        let config = Config::for_database_url(":memory:".into(), "key".into());
        assert_eq!(config.jwt_issuer, "TodoApi");
        assert_eq!(config.jwt_audience, "TodoApp");
        assert_eq!(config.jwt_ttl, Duration::hours(24));
        assert!(config.seed_admin.is_none());
    }

    #[test]
    fn unset_variables_fall_back() {
        assert_eq!(var_or("TODO_SERVICE_TEST_UNSET_VAR", "fallback"), "fallback");
        assert_eq!(parse_or("TODO_SERVICE_TEST_UNSET_VAR", 42u16).unwrap(), 42);
    }
}
