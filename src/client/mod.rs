//! Typed HTTP client for the todo API, with session handling and an
//! optimistic local cache.

pub mod api;
pub mod cache;
pub mod session;

pub use api::TodoClient;
pub use cache::TodoCache;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionError, SessionStore};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server rejected the token; the session has been torn down.
    #[error("not authenticated")]
    Unauthorized,
    #[error("resource not found")]
    NotFound,
    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Session(#[from] SessionError),
}
