pub mod dto;
pub mod todo;
pub mod user;
