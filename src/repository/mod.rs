pub mod database;
pub mod schema;
pub mod todos;
pub mod users;

pub use database::{Database, RepositoryError};
