//! Client-side login state.
//!
//! A [`Session`] is created with [`Session::init`] from a [`SessionStore`]
//! and ended with [`Session::teardown`]. It lapses when the token expires or
//! after [`IDLE_TIMEOUT_MINUTES`] without a request.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::models::dto::AuthResponse;
use crate::models::user::UserDto;

pub const IDLE_TIMEOUT_MINUTES: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage failed: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode session: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserDto,
    pub last_activity: DateTime<Utc>,
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>, SessionError>;
    fn save(&self, session: &StoredSession) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<StoredSession>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// Persists the session as a JSON file. An unreadable file counts as no session.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                tracing::warn!(error = %err, path = %self.path.display(), "discarding corrupt session file");
                self.clear()?;
                Ok(None)
            }
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

pub struct Session {
    store: Arc<dyn SessionStore>,
    current: Mutex<Option<StoredSession>>,
    idle_timeout: Duration,
}

impl Session {
    pub fn init(store: Arc<dyn SessionStore>, now: DateTime<Utc>) -> Result<Self, SessionError> {
        Self::init_with_idle_timeout(store, Duration::minutes(IDLE_TIMEOUT_MINUTES), now)
    }

    /// Restores whatever `store` holds, discarding it when already lapsed.
    pub fn init_with_idle_timeout(
        store: Arc<dyn SessionStore>,
        idle_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let stored = store.load()?;
        let session = Self {
            store,
            current: Mutex::new(None),
            idle_timeout,
        };
        match stored {
            Some(stored) if session.is_live(&stored, now) => *session.current.lock() = Some(stored),
            Some(_) => {
                tracing::info!("discarding lapsed session");
                session.store.clear()?;
            }
            None => {}
        }
        Ok(session)
    }

    fn is_live(&self, session: &StoredSession, now: DateTime<Utc>) -> bool {
        now < session.expires_at && now - session.last_activity <= self.idle_timeout
    }

    /// Starts a session from a login or register response.
    pub fn begin(&self, auth: &AuthResponse, now: DateTime<Utc>) -> Result<(), SessionError> {
        let session = StoredSession {
            token: auth.token.clone(),
            refresh_token: auth.refresh_token.clone(),
            expires_at: auth.expires_at,
            user: auth.user.clone(),
            last_activity: now,
        };
        self.store.save(&session)?;
        *self.current.lock() = Some(session);
        Ok(())
    }

    /// The bearer token to send now, recording the activity.
    /// A lapsed session is torn down and yields `None`.
    pub fn token(&self, now: DateTime<Utc>) -> Result<Option<String>, SessionError> {
        let touched = {
            let mut current = self.current.lock();
            let Some(session) = current.as_mut() else {
                return Ok(None);
            };
            if self.is_live(session, now) {
                session.last_activity = now;
                Some(session.clone())
            } else {
                *current = None;
                None
            }
        };
        match touched {
            Some(session) => {
                self.store.save(&session)?;
                Ok(Some(session.token))
            }
            None => {
                tracing::info!("session lapsed");
                self.store.clear()?;
                Ok(None)
            }
        }
    }

    pub fn user(&self) -> Option<UserDto> {
        self.current.lock().as_ref().map(|session| session.user.clone())
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|session| self.is_live(session, now))
    }

    /// Time until the session lapses, whichever of idleness or expiry comes first.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        self.current
            .lock()
            .as_ref()
            .map(|session| {
                let idle = session.last_activity + self.idle_timeout - now;
                let expiry = session.expires_at - now;
                idle.min(expiry).max(Duration::zero())
            })
            .unwrap_or_else(Duration::zero)
    }

    pub fn teardown(&self) -> Result<(), SessionError> {
        *self.current.lock() = None;
        self.store.clear()
    }
}
