//! A multi-user todo service: REST API, persistence and a typed client.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod engine;
pub mod errors;
pub mod models;
pub mod repository;
pub mod telemetry;
