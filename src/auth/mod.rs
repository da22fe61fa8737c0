//! Accounts, password hashing and bearer tokens.
//!
//! The todo endpoints only ever see [`AuthenticatedUser::user_id`].

pub mod extractor;
pub mod jwt;
pub mod password;
pub mod service;

pub use extractor::AuthenticatedUser;
pub use jwt::{Claims, TokenIssuer};
pub use password::PasswordHasher;
pub use service::AuthService;

use crate::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email `{0}` is already registered")]
    EmailTaken(String),
    #[error("current password does not match")]
    WrongPassword,
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
